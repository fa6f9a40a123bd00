//! Blogs table

use crate::error::ConfigError;
use crate::error::Error;
use crate::gateway::BlogGateway;
use crate::model::BlogStatus;
use crate::session::TableSession;
use crate::table::ColumnDef;
use crate::table::ColumnPinning;
use crate::table::FilterField;
use crate::table::FilterOption;
use crate::table::InitialState;
use crate::table::QueryState;
use crate::table::SortItem;
use crate::table::TableController;
use crate::table::TableOptions;
use crate::table::TableSchema;

pub const SELECT: &str = "select";
pub const TITLE: &str = "title";
pub const STATUS: &str = "status";
pub const CREATED_AT: &str = "created_at";
pub const AUTHOR: &str = "author";
pub const ACTIONS: &str = "actions";

pub fn schema() -> Result<TableSchema, ConfigError> {
    TableSchema::new(
        vec![
            ColumnDef::control(SELECT),
            ColumnDef::new(TITLE, "Title"),
            ColumnDef::new(STATUS, "Status"),
            ColumnDef::new(CREATED_AT, "Created At"),
            ColumnDef::new(AUTHOR, "Author"),
            ColumnDef::control(ACTIONS),
        ],
        vec![
            FilterField::text(TITLE, "Title").with_placeholder("Filter titles..."),
            FilterField::multi_select(STATUS, "Status", status_options()),
        ],
    )
}

/// One option per [`BlogStatus`], labelled in sentence case.
pub fn status_options() -> Vec<FilterOption> {
    BlogStatus::ALL
        .iter()
        .map(|status| FilterOption::new(status.label(), status.as_str()).with_icon(status.icon()))
        .collect()
}

/// Newest first, row actions pinned to the right edge.
pub fn initial_state() -> InitialState {
    InitialState::new()
        .with_sort([SortItem::desc(CREATED_AT)])
        .with_pinning(ColumnPinning::right([ACTIONS]))
}

pub fn options() -> TableOptions {
    TableOptions::default()
}

/// Builds the blogs table, restoring `shared` if given.
pub fn controller<R: crate::model::Row>(shared: Option<&QueryState>) -> Result<TableController<R>, Error> {
    TableController::new(schema()?, initial_state(), options(), shared)
}

/// Builds a blogs table session over the SQLite gateway.
pub fn session(gateway: BlogGateway, shared: Option<&QueryState>) -> Result<TableSession<BlogGateway>, Error> {
    Ok(TableSession::new(controller(shared)?, gateway))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::query::Direction;
    use crate::table::FilterKind;
    use crate::table::PinSide;

    #[test]
    fn test_schema() {
        let schema = schema().unwrap();
        let ids = schema.columns().iter().map(|c| c.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec![SELECT, TITLE, STATUS, CREATED_AT, AUTHOR, ACTIONS]);
        assert!(schema.sortable_column(SELECT).is_err());
        assert!(schema.hideable_column(ACTIONS).is_err());

        let title = schema.filter_field(TITLE).unwrap();
        assert_eq!(
            title.kind,
            FilterKind::Text {
                placeholder: Some("Filter titles...".into())
            }
        );
    }

    #[test]
    fn test_status_options() {
        let options = status_options();
        assert_eq!(options[0].label, "Published");
        assert_eq!(options[0].value, "PUBLISHED");
        assert_eq!(options[0].icon.as_deref(), Some("check-circle-2"));
        assert_eq!(options[1].label, "Draft");
        assert_eq!(options[1].icon.as_deref(), Some("timer"));
    }

    #[test]
    fn test_initial_view() {
        let table = controller::<Record>(None).unwrap();
        assert_eq!(table.state().page_size, 10);
        assert_eq!(table.state().sort_of(CREATED_AT).map(SortItem::direction), Some(Direction::Desc));
        assert_eq!(table.state().pinning.side_of(ACTIONS), Some(PinSide::Right));
        assert!(table.query_state().is_empty());
    }
}
