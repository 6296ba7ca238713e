use crate::command::Operation;
use crate::test_helpers::factories::CommandFactory;

#[test]
fn builds_sql_query_accepting_csv_by_default() {
    let command = CommandFactory::sql().create();
    assert_eq!(command.language().as_str(), "sql");
    assert_eq!(command.operation(), Operation::Query);
    assert_eq!(command.text(), "SELECT 1");
    assert_eq!(command.acceptable()[0].to_string(), "text/csv");
}

#[test]
fn applies_overrides() {
    let command = CommandFactory::sparql()
        .with_text("ASK {}")
        .as_update()
        .with_parameter("limit", "5")
        .accepting(&["application/json", "text/csv"])
        .with_owner("alice")
        .create();
    assert_eq!(command.text(), "ASK {}");
    assert_eq!(command.operation(), Operation::Update);
    assert_eq!(command.parameters()["limit"], "5");
    assert_eq!(command.acceptable().len(), 2);
    assert_eq!(command.owner().unwrap().name(), "alice");
    assert_eq!(command.properties()["owner"], "alice");
}
