//! SQLite gateways against in-memory databases.

use std::collections::BTreeSet;
use std::time::Duration;

use blogdesk_lib::admin::blogs;
use blogdesk_lib::admin::organizations;
use blogdesk_lib::error::GatewayError;
use blogdesk_lib::gateway::Gateway;
use blogdesk_lib::gateway::SqliteStore;
use blogdesk_lib::model::BlogPatch;
use blogdesk_lib::model::BlogStatus;
use blogdesk_lib::model::BlogWithAuthor;
use blogdesk_lib::model::NewBlog;
use blogdesk_lib::model::NewMember;
use blogdesk_lib::model::NewOrganization;
use blogdesk_lib::model::Organization;
use blogdesk_lib::model::OrganizationMember;
use blogdesk_lib::model::Role;
use blogdesk_lib::model::Row;
use blogdesk_lib::query::Filter;
use blogdesk_lib::query::ListRequest;
use blogdesk_lib::query::OrderBy;
use blogdesk_lib::query::Pagination;
use blogdesk_lib::table::FilterField;
use blogdesk_lib::table::FilterValue;

struct Fixture {
    store: SqliteStore,
    organization: Organization,
    ada: OrganizationMember,
    grace: OrganizationMember,
}

async fn fixture() -> Fixture {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let organization = store
        .organizations()
        .create(NewOrganization::new("Acme Writers", "https://example.com/acme.png"))
        .await
        .unwrap();
    let ada = store
        .add_member(NewMember::new("user-ada", &organization.id, "Ada").role(Role::Owner))
        .await
        .unwrap();
    let grace = store
        .add_member(NewMember::new("user-grace", &organization.id, "Grace"))
        .await
        .unwrap();
    Fixture {
        store,
        organization,
        ada,
        grace,
    }
}

async fn seed_blogs(fixture: &Fixture) -> Vec<BlogWithAuthor> {
    let gateway = fixture.store.blogs();
    let mut created = Vec::new();
    for (author, title, status) in [
        (&fixture.ada, "Hello World", BlogStatus::Published),
        (&fixture.grace, "Rust tips", BlogStatus::Draft),
        (&fixture.ada, "Another world tour", BlogStatus::Draft),
        (&fixture.grace, "50% off_sale", BlogStatus::Published),
    ] {
        let blog = gateway
            .create(NewBlog::new(&author.id, title, "body").status(status).tags(["news"]))
            .await
            .unwrap();
        created.push(blog);
    }
    created
}

fn request(filter: Filter, order: OrderBy, page_index: usize, page_size: usize) -> ListRequest {
    ListRequest {
        filter,
        order,
        pagination: Pagination::new(page_index, page_size),
    }
}

fn titles(rows: &[BlogWithAuthor]) -> Vec<&str> {
    rows.iter().map(|r| r.blog.title.as_str()).collect()
}

#[tokio::test]
async fn test_create_blog_fills_generated_fields() {
    let fixture = fixture().await;
    let blog = fixture
        .store
        .blogs()
        .create(NewBlog::new(&fixture.ada.id, "Hello, World!", "First post"))
        .await
        .unwrap();

    assert_eq!(blog.blog.slug, "hello-world");
    assert_eq!(blog.blog.status, BlogStatus::Draft);
    assert_eq!(blog.blog.likes, 0);
    assert_eq!(blog.blog.organization_id.as_deref(), Some(fixture.organization.id.as_str()));
    assert!(blog.blog.created_at.is_some());
    assert_eq!(blog.author.display_name(), "Ada");
    assert_eq!(blog.author.role, Role::Owner);
}

#[tokio::test]
async fn test_create_with_unknown_author_is_rejected() {
    let fixture = fixture().await;
    let err = fixture
        .store
        .blogs()
        .create(NewBlog::new("nobody", "Title", "Body"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn test_list_filters_and_sorts() {
    let fixture = fixture().await;
    seed_blogs(&fixture).await;
    let gateway = fixture.store.blogs();

    let rows = gateway
        .list(&request(Filter::contains("title", "WORLD"), OrderBy::asc("title"), 0, 10))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["Another world tour", "Hello World"]);

    let rows = gateway
        .list(&request(
            Filter::is_in("status", ["PUBLISHED"]),
            OrderBy::asc("author").then_desc("title"),
            0,
            10,
        ))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["Hello World", "50% off_sale"]);

    let rows = gateway
        .list(&request(Filter::contains("title", "0% off_"), OrderBy::none(), 0, 10))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["50% off_sale"]);
}

#[tokio::test]
async fn test_text_filter_folds_non_ascii_like_in_memory() {
    let fixture = fixture().await;
    let gateway = fixture.store.blogs();
    gateway
        .create(NewBlog::new(&fixture.ada.id, "Über Ärger", "body"))
        .await
        .unwrap();
    gateway
        .create(NewBlog::new(&fixture.grace.id, "Plain title", "body"))
        .await
        .unwrap();

    let field = FilterField::text("title", "Title");
    for needle in ["über", "ÄRGER", "r ä"] {
        let value = FilterValue::text(needle);
        assert!(field.matches("Über Ärger", &value), "in-memory: {}", needle);
        assert_eq!(
            gateway.count(&field.to_filter(&value)).await.unwrap(),
            1,
            "sqlite: {}",
            needle
        );
    }
}

#[tokio::test]
async fn test_count_ignores_pagination() {
    let fixture = fixture().await;
    seed_blogs(&fixture).await;
    let gateway = fixture.store.blogs();

    let rows = gateway
        .list(&request(Filter::all(), OrderBy::asc("title"), 1, 3))
        .await
        .unwrap();
    assert_eq!(titles(&rows), vec!["Rust tips"]);
    assert_eq!(gateway.count(&Filter::all()).await.unwrap(), 4);
    assert_eq!(
        gateway
            .count(&Filter::is_in("status", ["DRAFT"]))
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_unknown_column_is_rejected() {
    let fixture = fixture().await;
    let err = fixture
        .store
        .blogs()
        .count(&Filter::eq("password", "x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn test_update_bumps_updated_at() {
    let fixture = fixture().await;
    let created = seed_blogs(&fixture).await.remove(1);
    let gateway = fixture.store.blogs();
    tokio::time::sleep(Duration::from_millis(5)).await;

    let updated = gateway
        .update(
            &created.blog.id,
            BlogPatch::new()
                .title("Rust tips, revised")
                .status(BlogStatus::Published)
                .image(Some("cover.png".into())),
        )
        .await
        .unwrap();
    assert_eq!(updated.blog.slug, "rust-tips-revised");
    assert_eq!(updated.blog.status, BlogStatus::Published);
    assert_eq!(updated.blog.image.as_deref(), Some("cover.png"));
    assert_eq!(updated.blog.body, "body");
    assert!(updated.blog.updated_at > created.blog.updated_at);

    let err = gateway.update("missing", BlogPatch::new().title("x")).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(_)));
}

#[tokio::test]
async fn test_batch_delete_is_all_or_nothing() {
    let fixture = fixture().await;
    let created = seed_blogs(&fixture).await;
    let gateway = fixture.store.blogs();

    let ids: BTreeSet<String> = [created[0].blog.id.clone(), "missing".to_string()].into();
    let err = gateway.delete(&ids).await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(id) if id == "missing"));
    assert_eq!(gateway.count(&Filter::all()).await.unwrap(), 4);

    let ids: BTreeSet<String> = created[..2].iter().map(|b| b.blog.id.clone()).collect();
    gateway.delete(&ids).await.unwrap();
    assert_eq!(gateway.count(&Filter::all()).await.unwrap(), 2);
    assert!(gateway.get(&created[0].blog.id).await.unwrap().is_none());

    let err = gateway.delete(&BTreeSet::new()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn test_organizations() {
    let fixture = fixture().await;
    let gateway = fixture.store.organizations();

    let err = gateway
        .create(NewOrganization::new("Acme  writers", "logo.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));

    gateway
        .create(NewOrganization::new("Zeta Press", "logo.png").description("Quarterly"))
        .await
        .unwrap();
    assert_eq!(gateway.count(&Filter::all()).await.unwrap(), 2);

    let members = fixture.store.members(&fixture.organization.id).await.unwrap();
    assert_eq!(members.len(), 2);

    let err = fixture
        .store
        .add_member(NewMember::new("user-x", "no-such-org", "X"))
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Rejected(_)));
}

#[tokio::test]
async fn test_blogs_session_over_sqlite() {
    let fixture = fixture().await;
    seed_blogs(&fixture).await;

    let mut session = blogs::session(fixture.store.blogs(), None).unwrap();
    session.refresh().await.unwrap();
    assert_eq!(session.controller().total_count(), Some(4));

    session
        .controller_mut()
        .set_filter(blogs::TITLE, FilterValue::text("world"))
        .unwrap();
    session
        .controller_mut()
        .set_filter(blogs::STATUS, FilterValue::set(["DRAFT"]))
        .unwrap();
    session.sync().await.unwrap();
    let ids = session
        .controller()
        .rows()
        .iter()
        .map(|r| r.blog.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, vec!["Another world tour"]);

    let id = session.controller().rows()[0].id().to_string();
    session.controller_mut().toggle_all(true);
    assert_eq!(session.delete_selected().await.unwrap(), 1);
    assert!(fixture.store.blogs().get(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_organizations_session_over_sqlite() {
    let fixture = fixture().await;
    let mut session = organizations::session(fixture.store.organizations(), None).unwrap();
    session.refresh().await.unwrap();

    let table = session.controller();
    assert_eq!(table.total_count(), Some(1));
    assert_eq!(table.rows()[0].slug, "acme-writers");
}
