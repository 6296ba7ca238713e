use spargebra::algebra::{AggregateExpression, Expression, GraphPattern, OrderExpression};
use spargebra::{GraphUpdateOperation, Query, Update};

/// Result shape of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryForm {
    Select,
    Ask,
    Construct,
    Describe,
}

impl QueryForm {
    pub fn of(query: &Query) -> Self {
        match query {
            Query::Select { .. } => QueryForm::Select,
            Query::Ask { .. } => QueryForm::Ask,
            Query::Construct { .. } => QueryForm::Construct,
            Query::Describe { .. } => QueryForm::Describe,
        }
    }

    /// Whether the query produces triples rather than solutions.
    pub fn is_graph(&self) -> bool {
        matches!(self, QueryForm::Construct | QueryForm::Describe)
    }
}

/// True if the query calls out to a remote endpoint.
pub fn query_is_federated(query: &Query) -> bool {
    let pattern = match query {
        Query::Select { pattern, .. }
        | Query::Ask { pattern, .. }
        | Query::Construct { pattern, .. }
        | Query::Describe { pattern, .. } => pattern,
    };
    has_service(pattern)
}

/// True if any operation of the update reads from a remote endpoint.
pub fn update_is_federated(update: &Update) -> bool {
    update.operations.iter().any(|operation| match operation {
        GraphUpdateOperation::DeleteInsert { pattern, .. } => has_service(pattern),
        _ => false,
    })
}

fn has_service(pattern: &GraphPattern) -> bool {
    match pattern {
        GraphPattern::Service { .. } => true,
        GraphPattern::Bgp { .. } | GraphPattern::Path { .. } | GraphPattern::Values { .. } => false,
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right }
        | GraphPattern::Lateral { left, right } => has_service(left) || has_service(right),
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => has_service(left) || has_service(right) || expression.as_ref().is_some_and(in_expression),
        GraphPattern::Filter { expr, inner } => in_expression(expr) || has_service(inner),
        GraphPattern::Extend {
            inner, expression, ..
        } => in_expression(expression) || has_service(inner),
        GraphPattern::OrderBy { inner, expression } => {
            has_service(inner)
                || expression.iter().any(|order| match order {
                    OrderExpression::Asc(e) | OrderExpression::Desc(e) => in_expression(e),
                })
        }
        GraphPattern::Group {
            inner, aggregates, ..
        } => {
            has_service(inner)
                || aggregates.iter().any(|(_, aggregate)| match aggregate {
                    AggregateExpression::FunctionCall { expr, .. } => in_expression(expr),
                    AggregateExpression::CountSolutions { .. } => false,
                })
        }
        GraphPattern::Graph { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. } => has_service(inner),
    }
}

/// `EXISTS` and `NOT EXISTS` filters embed whole patterns.
fn in_expression(expression: &Expression) -> bool {
    match expression {
        Expression::Exists(pattern) => has_service(pattern),
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_) => false,
        Expression::Or(a, b)
        | Expression::And(a, b)
        | Expression::Equal(a, b)
        | Expression::SameTerm(a, b)
        | Expression::Greater(a, b)
        | Expression::GreaterOrEqual(a, b)
        | Expression::Less(a, b)
        | Expression::LessOrEqual(a, b)
        | Expression::Add(a, b)
        | Expression::Subtract(a, b)
        | Expression::Multiply(a, b)
        | Expression::Divide(a, b) => in_expression(a) || in_expression(b),
        Expression::UnaryPlus(e) | Expression::UnaryMinus(e) | Expression::Not(e) => in_expression(e),
        Expression::In(e, list) => in_expression(e) || list.iter().any(in_expression),
        Expression::If(a, b, c) => in_expression(a) || in_expression(b) || in_expression(c),
        Expression::Coalesce(list) | Expression::FunctionCall(_, list) => list.iter().any(in_expression),
    }
}
