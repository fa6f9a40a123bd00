//! Organizations table

use crate::error::ConfigError;
use crate::error::Error;
use crate::gateway::OrganizationGateway;
use crate::session::TableSession;
use crate::table::ColumnDef;
use crate::table::FilterField;
use crate::table::InitialState;
use crate::table::QueryState;
use crate::table::SortItem;
use crate::table::TableController;
use crate::table::TableOptions;
use crate::table::TableSchema;

pub const NAME: &str = "name";
pub const SLUG: &str = "slug";
pub const CREATED_AT: &str = "created_at";

pub fn schema() -> Result<TableSchema, ConfigError> {
    TableSchema::new(
        vec![
            ColumnDef::new(NAME, "Name"),
            ColumnDef::new(SLUG, "Slug"),
            ColumnDef::new(CREATED_AT, "Created At"),
        ],
        vec![FilterField::text(NAME, "Name").with_placeholder("Filter names...")],
    )
}

pub fn initial_state() -> InitialState {
    InitialState::new().with_sort([SortItem::desc(CREATED_AT)])
}

pub fn options() -> TableOptions {
    TableOptions::default()
}

pub fn controller<R: crate::model::Row>(shared: Option<&QueryState>) -> Result<TableController<R>, Error> {
    TableController::new(schema()?, initial_state(), options(), shared)
}

pub fn session(
    gateway: OrganizationGateway,
    shared: Option<&QueryState>,
) -> Result<TableSession<OrganizationGateway>, Error> {
    Ok(TableSession::new(controller(shared)?, gateway))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Record;
    use crate::table::FilterValue;

    #[test]
    fn test_name_filter_round_trips() {
        let mut table = controller::<Record>(None).unwrap();
        table.set_filter(NAME, FilterValue::text("acme")).unwrap();
        let shared = table.query_state();
        assert_eq!(shared.to_query_string(), "name=acme");

        let restored = controller::<Record>(Some(&shared)).unwrap();
        assert_eq!(restored.state(), table.state());
    }
}
