//! Command handlers

use blogdesk_lib::TableSession;
use blogdesk_lib::admin::blogs;
use blogdesk_lib::admin::organizations;
use blogdesk_lib::gateway::Gateway;
use blogdesk_lib::gateway::SqliteStore;
use blogdesk_lib::model::BlogPatch;
use blogdesk_lib::model::BlogStatus;
use blogdesk_lib::model::NewBlog;
use blogdesk_lib::model::NewMember;
use blogdesk_lib::model::NewOrganization;
use blogdesk_lib::model::Role;
use blogdesk_lib::query::Direction;
use blogdesk_lib::query::Filter;
use blogdesk_lib::table::FilterValue;
use blogdesk_lib::table::QueryState;
use blogdesk_lib::table::RowAction;
use blogdesk_lib::table::TableController;

use crate::BlogCommand;
use crate::Cli;
use crate::Command;
use crate::MemberCommand;
use crate::OrgCommand;
use crate::ViewArgs;
use crate::error::CliError;
use crate::paths;
use crate::paths::Paths;
use crate::render;
use crate::settings::SettingsProvider;
use crate::settings::SqliteBackend;

const BLOGS_TABLE: &str = "blogs";
const ORGANIZATIONS_TABLE: &str = "organizations";

/// Upper bound on fetches per `list`; a clamped page costs one extra round trip.
const MAX_FETCHES: usize = 3;

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let files = Paths::resolve(cli.db, cli.settings)
        .ok_or_else(|| CliError::usage("cannot determine a data directory; pass --db and --settings"))?;
    paths::ensure_parent(&files.database)?;
    log::info!("Opening database {}", files.database.display());
    let store = SqliteStore::open(&files.database).await?;

    match cli.command {
        Command::Seed => seed(&store).await,
        Command::Blogs { command } => {
            let settings = open_settings(&files).await?;
            run_blogs(&store, &settings, command).await
        }
        Command::Orgs { command } => {
            let settings = open_settings(&files).await?;
            run_orgs(&store, &settings, command).await
        }
        Command::Members { command } => run_members(&store, command).await,
        Command::Views => show_saved_views(&open_settings(&files).await?).await,
    }
}

async fn open_settings(files: &Paths) -> Result<SettingsProvider, CliError> {
    paths::ensure_parent(&files.settings)?;
    Ok(SettingsProvider::new(SqliteBackend::new(&files.settings).await?))
}

async fn show_saved_views(settings: &SettingsProvider) -> Result<(), CliError> {
    for table in settings.saved_tables().await? {
        if let Some(state) = settings.query_state(&table).await? {
            println!("{:<14} ?{}", table, state);
        }
    }
    Ok(())
}

async fn run_blogs(store: &SqliteStore, settings: &SettingsProvider, command: BlogCommand) -> Result<(), CliError> {
    match command {
        BlogCommand::List { view, title, status } => {
            let shared = shared_state(settings, BLOGS_TABLE, &view).await?;
            let mut session = blogs::session(store.blogs(), shared.as_ref())?;
            apply_view(session.controller_mut(), &view)?;
            if let Some(title) = title {
                session
                    .controller_mut()
                    .set_filter(blogs::TITLE, FilterValue::text(title))?;
            }
            if !status.is_empty() {
                let status = status.iter().map(|s| s.to_uppercase());
                session
                    .controller_mut()
                    .set_filter(blogs::STATUS, FilterValue::set(status))?;
            }
            show(&mut session, view.page, settings, BLOGS_TABLE).await
        }
        BlogCommand::Create {
            author,
            title,
            body,
            organization,
            image,
            tags,
            status,
        } => {
            let mut fields = NewBlog::new(author, title, body)
                .tags(tags)
                .status(parse_status(&status)?);
            if let Some(organization) = organization {
                fields = fields.organization(organization);
            }
            if let Some(image) = image {
                fields = fields.image(image);
            }
            let mut session = blogs::session(store.blogs(), None)?;
            let blog = session.create(fields).await?;
            println!("Created {} ({})", blog.blog.id, blog.blog.slug);
            Ok(())
        }
        BlogCommand::Update {
            id,
            title,
            body,
            image,
            clear_image,
            tags,
            status,
        } => {
            let mut patch = BlogPatch::new();
            if let Some(title) = title {
                patch = patch.title(title);
            }
            if let Some(body) = body {
                patch = patch.body(body);
            }
            if image.is_some() || clear_image {
                patch = patch.image(image);
            }
            if let Some(tags) = tags {
                patch = patch.tags(tags);
            }
            if let Some(status) = status {
                patch = patch.status(parse_status(&status)?);
            }
            if patch.is_empty() {
                return Err(CliError::usage("nothing to update"));
            }

            let mut session = blogs::session(store.blogs(), None)?;
            session.set_action(Some(RowAction::update(id)));
            let blog = session.submit_update(patch).await?;
            println!("Updated {} ({})", blog.blog.id, blog.blog.slug);
            Ok(())
        }
        BlogCommand::Delete { ids } => {
            let mut session = blogs::session(store.blogs(), None)?;
            session.controller_mut().set_row_selection(ids);
            let removed = session.delete_selected().await?;
            println!("Deleted {} post(s)", removed);
            Ok(())
        }
    }
}

async fn run_orgs(store: &SqliteStore, settings: &SettingsProvider, command: OrgCommand) -> Result<(), CliError> {
    match command {
        OrgCommand::List { view, name } => {
            let shared = shared_state(settings, ORGANIZATIONS_TABLE, &view).await?;
            let mut session = organizations::session(store.organizations(), shared.as_ref())?;
            apply_view(session.controller_mut(), &view)?;
            if let Some(name) = name {
                session
                    .controller_mut()
                    .set_filter(organizations::NAME, FilterValue::text(name))?;
            }
            show(&mut session, view.page, settings, ORGANIZATIONS_TABLE).await
        }
        OrgCommand::Create {
            name,
            logo,
            description,
        } => {
            let mut fields = NewOrganization::new(name, logo);
            if let Some(description) = description {
                fields = fields.description(description);
            }
            let mut session = organizations::session(store.organizations(), None)?;
            let organization = session.create(fields).await?;
            println!("Created {} ({})", organization.id, organization.slug);
            Ok(())
        }
    }
}

async fn run_members(store: &SqliteStore, command: MemberCommand) -> Result<(), CliError> {
    match command {
        MemberCommand::Add { org, user, name, role } => {
            let role: Role = role.to_uppercase().parse()?;
            let member = store.add_member(NewMember::new(user, org, name).role(role)).await?;
            println!("Added member {} as {}", member.id, member.role);
            Ok(())
        }
        MemberCommand::List { org } => {
            for member in store.members(&org).await? {
                println!("{}  {:<6}  {}", member.id, member.role.as_str(), member.display_name());
            }
            Ok(())
        }
    }
}

/// The shared state to open: an explicit `--query`, or the saved one with `--restore`.
async fn shared_state(
    settings: &SettingsProvider,
    table: &str,
    view: &ViewArgs,
) -> Result<Option<QueryState>, CliError> {
    if let Some(query) = &view.query {
        return Ok(Some(QueryState::from_query_string(query)));
    }
    if view.restore {
        let saved = settings.query_state(table).await?;
        if saved.is_none() {
            log::info!("No saved view for {}", table);
        }
        return Ok(saved);
    }
    Ok(None)
}

fn apply_view<R: blogdesk_lib::model::Row>(table: &mut TableController<R>, view: &ViewArgs) -> Result<(), CliError> {
    if let Some(per_page) = view.per_page {
        table.set_page_size(per_page)?;
    }
    if let Some(sort) = &view.sort {
        let (column, direction) = parse_sort(sort);
        table.set_sort(column, Some(direction))?;
    }
    Ok(())
}

/// Loads the requested page, prints it and saves the view.
async fn show<G: Gateway>(
    session: &mut TableSession<G>,
    page: Option<usize>,
    settings: &SettingsProvider,
    table: &str,
) -> Result<(), CliError> {
    for warning in session.controller().warnings() {
        eprintln!("warning: {}", warning);
    }

    load(session).await?;
    if let Some(page) = page {
        let index = i64::try_from(page).unwrap_or(i64::MAX) - 1;
        session.controller_mut().set_page(index);
        load(session).await?;
    }

    let controller = session.controller();
    let view = controller.view();
    print!("{}", render::page(&view));
    println!("{}", render::summary(&view));

    let shared = controller.query_state();
    if !shared.is_empty() {
        println!("Share: ?{}", shared);
    }
    if let Err(e) = settings.set_query_state(table, &shared).await {
        log::warn!("Failed to save view for {}: {}", table, e);
    }
    Ok(())
}

async fn load<G: Gateway>(session: &mut TableSession<G>) -> Result<(), CliError> {
    for _ in 0..MAX_FETCHES {
        if session.sync().await?.is_none() {
            break;
        }
    }
    Ok(())
}

async fn seed(store: &SqliteStore) -> Result<(), CliError> {
    let organizations = store.organizations();
    if organizations.count(&Filter::all()).await? > 0 {
        println!("Database already has data; nothing seeded");
        return Ok(());
    }

    let organization = organizations
        .create(
            NewOrganization::new("Acme Writers", "https://example.com/acme.png")
                .description("Sample organization"),
        )
        .await?;
    let ada = store
        .add_member(NewMember::new("ada", &organization.id, "Ada Lovelace").role(Role::Owner))
        .await?;
    let grace = store
        .add_member(NewMember::new("grace", &organization.id, "Grace Hopper").role(Role::Admin))
        .await?;

    let gateway = store.blogs();
    let topics = [
        "Getting started",
        "Release notes",
        "Hiring update",
        "Quarterly review",
        "Design principles",
        "Community spotlight",
    ];
    let mut posts = 0;
    for (i, topic) in topics.iter().enumerate() {
        for part in 1..=2 {
            let author = if (i + part) % 2 == 0 { &ada } else { &grace };
            let status = if part == 1 { BlogStatus::Published } else { BlogStatus::Draft };
            gateway
                .create(
                    NewBlog::new(&author.id, format!("{} part {}", topic, part), "Lorem ipsum")
                        .tags(["sample"])
                        .status(status),
                )
                .await?;
            posts += 1;
        }
    }

    println!("Seeded organization {} with 2 members and {} posts", organization.id, posts);
    println!("Authors: {} ({}), {} ({})", ada.id, ada.display_name(), grace.id, grace.display_name());
    Ok(())
}

fn parse_status(status: &str) -> Result<BlogStatus, CliError> {
    Ok(status.to_uppercase().parse()?)
}

/// Splits `title.desc` into its column and direction; no suffix means ascending.
fn parse_sort(sort: &str) -> (&str, Direction) {
    match sort.rsplit_once('.') {
        Some((column, "desc")) => (column, Direction::Desc),
        Some((column, "asc")) => (column, Direction::Asc),
        _ => (sort, Direction::Asc),
    }
}
