//! Table session against the in-memory gateway.

use std::collections::BTreeSet;

use blogdesk_lib::Error;
use blogdesk_lib::TableSession;
use blogdesk_lib::admin::blogs;
use blogdesk_lib::error::GatewayError;
use blogdesk_lib::gateway::InMemoryGateway;
use blogdesk_lib::gateway::fetch_page;
use blogdesk_lib::model::Record;
use blogdesk_lib::model::Row;
use blogdesk_lib::table::FetchOutcome;
use blogdesk_lib::table::FilterValue;
use blogdesk_lib::table::QueryState;
use blogdesk_lib::table::RowAction;
use blogdesk_lib::table::RowActionKind;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;

fn records(n: usize) -> Vec<Record> {
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (1..=n)
        .map(|i| {
            Record::new(format!("b{:02}", i))
                .set("title", format!("Post number {}", i))
                .set("status", if i % 2 == 0 { "PUBLISHED" } else { "DRAFT" })
                .set("created_at", base + Duration::minutes(i as i64))
        })
        .collect()
}

fn session(n: usize) -> TableSession<InMemoryGateway<Record>> {
    TableSession::new(
        blogs::controller(None).unwrap(),
        InMemoryGateway::with_rows(records(n)),
    )
}

fn loaded_ids(session: &TableSession<InMemoryGateway<Record>>) -> Vec<String> {
    session
        .controller()
        .rows()
        .iter()
        .map(|r| r.id().to_string())
        .collect()
}

#[tokio::test]
async fn test_refresh_loads_newest_first() {
    let mut session = session(25);
    assert_eq!(session.sync().await.unwrap(), Some(FetchOutcome::Applied));

    let table = session.controller();
    assert_eq!(table.total_count(), Some(25));
    assert_eq!(table.page_count(), 3);
    assert_eq!(table.rows().len(), 10);
    assert_eq!(table.rows()[0].id(), "b25");

    assert_eq!(session.sync().await.unwrap(), None);
}

#[tokio::test]
async fn test_filter_and_page() {
    let mut session = session(25);
    session.sync().await.unwrap();

    session.controller_mut().set_page(2);
    session.sync().await.unwrap();
    assert_eq!(session.controller().rows().len(), 5);

    session
        .controller_mut()
        .set_filter("status", FilterValue::set(["PUBLISHED"]))
        .unwrap();
    assert_eq!(session.controller().state().page_index, 0);
    session.sync().await.unwrap();
    assert_eq!(session.controller().total_count(), Some(12));
    assert_eq!(session.controller().page_count(), 2);

    session
        .controller_mut()
        .set_filter("title", FilterValue::text("NUMBER 1"))
        .unwrap();
    session.sync().await.unwrap();
    let ids = loaded_ids(&session);
    assert_eq!(ids, vec!["b18", "b16", "b14", "b12", "b10"]);
}

#[tokio::test]
async fn test_shared_state_restores_view() {
    let shared = QueryState::from_query_string("page=2&perPage=20&sort=title.asc");
    let mut session = TableSession::new(
        blogs::controller(Some(&shared)).unwrap(),
        InMemoryGateway::with_rows(records(25)),
    );
    session.sync().await.unwrap();

    let table = session.controller();
    assert_eq!(table.state().page_index, 1);
    assert_eq!(table.rows().len(), 5);
    assert_eq!(
        table.query_state().to_query_string(),
        "page=2&perPage=20&sort=title.asc"
    );
}

#[tokio::test]
async fn test_out_of_range_shared_page_is_clamped() {
    let shared = QueryState::from_query_string("page=40");
    let mut session = TableSession::new(
        blogs::controller(Some(&shared)).unwrap(),
        InMemoryGateway::with_rows(records(25)),
    );

    session.sync().await.unwrap();
    assert_eq!(session.controller().state().page_index, 2);
    assert!(session.controller().needs_fetch());

    session.sync().await.unwrap();
    assert_eq!(loaded_ids(&session), vec!["b05", "b04", "b03", "b02", "b01"]);
}

#[tokio::test]
async fn test_batch_delete_failure_keeps_selection() {
    let mut session = session(5);
    session.sync().await.unwrap();
    session.controller_mut().set_row_selection(["b01", "b02"]);

    session.gateway().set_unavailable(true);
    let err = session.delete_selected().await.unwrap_err();
    assert!(matches!(err, Error::Gateway(GatewayError::Unavailable(_))));

    let expected: BTreeSet<String> = ["b01".to_string(), "b02".to_string()].into();
    assert_eq!(session.controller().selection(), &expected);
    assert_eq!(session.gateway().len(), 5);
}

#[tokio::test]
async fn test_partial_batch_is_a_failure() {
    let mut session = session(5);
    session.sync().await.unwrap();
    session.controller_mut().set_row_selection(["b01", "b02", "b03"]);
    session.gateway().set_partial_batches(true);

    let err = session.delete_selected().await.unwrap_err();
    assert!(matches!(
        err,
        Error::BatchPartiality {
            requested: 3,
            removed: 1
        }
    ));
    assert_eq!(session.controller().selection().len(), 3);
}

#[tokio::test]
async fn test_retry_after_partial_batch_reports_removed_rows() {
    let mut session = session(5);
    session.sync().await.unwrap();
    session.controller_mut().set_row_selection(["b01", "b02", "b03"]);
    session.gateway().set_partial_batches(true);
    session.delete_selected().await.unwrap_err();
    session.gateway().set_partial_batches(false);

    let err = session.delete_selected().await.unwrap_err();
    assert!(matches!(err, Error::Gateway(GatewayError::NotFound(ref id)) if id == "b01"));
    assert_eq!(session.gateway().len(), 4);
    assert_eq!(session.controller().selection().len(), 3);

    session.controller_mut().toggle_row("b01", false);
    assert_eq!(session.delete_selected().await.unwrap(), 2);
    assert_eq!(session.gateway().len(), 2);
    assert!(session.controller().selection().is_empty());
}

#[tokio::test]
async fn test_delete_selected() {
    let mut session = session(12);
    session.sync().await.unwrap();
    session.controller_mut().toggle_all(true);
    assert!(session.controller().is_all_page_rows_selected());

    assert_eq!(session.delete_selected().await.unwrap(), 10);
    assert!(session.controller().selection().is_empty());

    session.sync().await.unwrap();
    assert_eq!(session.controller().total_count(), Some(2));
    assert_eq!(session.controller().page_count(), 1);
}

#[tokio::test]
async fn test_row_action_flow() {
    let mut session = session(3);
    session.sync().await.unwrap();

    session.set_action(Some(RowAction::update("b01")));
    session.set_action(Some(RowAction::delete("b02")));
    assert!(session.actions().is_open(RowActionKind::Delete));
    assert_eq!(session.pending_row().map(|r| r.id()), Some("b02"));

    let err = session
        .submit_update(Record::new("b01"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoPendingAction(RowActionKind::Update)));

    session.confirm_delete().await.unwrap();
    assert!(session.actions().pending().is_none());
    assert!(!session.gateway().contains("b02"));
}

#[tokio::test]
async fn test_failed_update_keeps_action_pending() {
    let mut session = session(3);
    session.sync().await.unwrap();
    session.set_action(Some(RowAction::update("b01")));

    session.gateway().set_unavailable(true);
    let patch = Record::new("b01").set("title", "Renamed");
    assert!(session.submit_update(patch.clone()).await.is_err());
    assert!(session.actions().is_open(RowActionKind::Update));

    session.gateway().set_unavailable(false);
    let row = session.submit_update(patch).await.unwrap();
    assert_eq!(row.get_text("title").unwrap(), Some("Renamed"));
    assert!(session.actions().pending().is_none());
    assert!(session.controller().needs_fetch());
}

#[tokio::test]
async fn test_cancel_closes_action() {
    let mut session = session(1);
    session.set_action(Some(RowAction::delete("b01")));
    session.cancel_action();
    assert!(session.confirm_delete().await.is_err());
    assert!(session.gateway().contains("b01"));
}

#[tokio::test]
async fn test_latest_fetch_wins() {
    let gateway = InMemoryGateway::with_rows(records(25));
    let mut table = blogs::controller::<Record>(None).unwrap();

    let first = table.begin_fetch().unwrap();
    table.set_filter("status", FilterValue::set(["DRAFT"])).unwrap();
    let second = table.begin_fetch().unwrap();

    let (old, new) = futures::join!(
        fetch_page(&gateway, first.request()),
        fetch_page(&gateway, second.request())
    );
    assert_eq!(table.complete_fetch(second, new).unwrap(), FetchOutcome::Applied);
    assert_eq!(table.complete_fetch(first, old).unwrap(), FetchOutcome::Stale);
    assert_eq!(table.total_count(), Some(13));
}
