use anyhow::{bail, Context};
use bookshelf_app::modules::books::messages::classify;
use bookshelf_app::modules::books::pagination::{FilterMap, LazyBookModel};
use bookshelf_app::{Application, BookDto, BookError};
use bookshelf_db::BookId;
use bookshelf_kernel::settings::Settings;
use clap::{Args, Parser, Subcommand};
use serde_json::json;

#[derive(Parser)]
#[command(name = "bookshelf")]
#[command(about = "Bookshelf catalog server and administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server until Ctrl-C
    Serve,
    /// Apply pending schema migrations
    Migrate,
    /// Inspect and edit the catalog
    #[command(subcommand)]
    Books(BookCommands),
}

#[derive(Subcommand)]
enum BookCommands {
    /// Print one page of books
    List {
        #[arg(long, default_value_t = 0)]
        offset: u64,
        /// Page size; defaults to the configured page size
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Print every book
    All,
    /// Print the number of books
    Count,
    /// Create a book
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long, allow_negative_numbers = true)]
        price: f64,
        #[arg(long)]
        isbn: Option<String>,
    },
    /// Edit a book; omitted fields keep their stored value
    Update {
        id: i64,
        /// Version last read; defaults to the stored version
        #[arg(long)]
        version: Option<i64>,
        #[command(flatten)]
        fields: FieldArgs,
    },
    /// Delete a book
    Delete { id: i64 },
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long)]
    author: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    price: Option<f64>,
    #[arg(long)]
    isbn: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().context("failed to load bookshelf settings")?;
    bookshelf_telemetry::init(&settings.telemetry)?;

    let app = Application::build(settings).await?;

    match cli.command {
        Commands::Serve => app.serve().await,
        Commands::Migrate => {
            let applied = app.migrate().await?;
            println!("applied {applied} migration(s)");
            app.stop().await
        }
        Commands::Books(command) => {
            app.migrate().await?;
            let outcome = run_books(&app, command).await;
            app.stop().await?;
            outcome
        }
    }
}

async fn run_books(app: &Application, command: BookCommands) -> anyhow::Result<()> {
    let service = app.service();

    match command {
        BookCommands::List { offset, limit } => {
            let pagination = &app.settings().pagination;
            let limit = limit.unwrap_or(pagination.default_page_size);
            if limit == 0 {
                bail!("--limit must be greater than zero");
            }
            let limit = limit.min(pagination.max_page_size);

            let mut model = LazyBookModel::new(service.clone());
            let filters = FilterMap::new();
            let total = model.row_count(&filters).await.map_err(user_error)?;
            let rows = model
                .load_page(offset, limit, &[], &filters)
                .await
                .map_err(user_error)?;
            print_json(&json!({
                "total": total,
                "offset": offset,
                "limit": limit,
                "rows": rows,
            }))
        }
        BookCommands::All => {
            let books = service.get_all_books().await.map_err(user_error)?;
            print_json(&books)
        }
        BookCommands::Count => {
            println!("{}", service.count_books().await.map_err(user_error)?);
            Ok(())
        }
        BookCommands::Add {
            title,
            author,
            price,
            isbn,
        } => {
            let dto = BookDto {
                title,
                author,
                price: Some(price),
                isbn,
                ..BookDto::default()
            };
            save(app, dto).await
        }
        BookCommands::Update {
            id,
            version,
            fields,
        } => {
            let mut dto = service.get_book(BookId(id)).await.map_err(user_error)?;
            if version.is_some() {
                dto.version = version;
            }
            if let Some(title) = fields.title {
                dto.title = title;
            }
            if let Some(author) = fields.author {
                dto.author = author;
            }
            if let Some(price) = fields.price {
                dto.price = Some(price);
            }
            if let Some(isbn) = fields.isbn {
                dto.isbn = Some(isbn);
            }
            save(app, dto).await
        }
        BookCommands::Delete { id } => {
            service.delete_book(BookId(id)).await.map_err(user_error)?;
            tracing::info!(book_id = id, "book deleted from the command line");
            println!("deleted book {id}");
            Ok(())
        }
    }
}

async fn save(app: &Application, dto: BookDto) -> anyhow::Result<()> {
    if let Err(errors) = dto.validate() {
        let reasons: Vec<_> = errors.fields().iter().map(|error| error.message).collect();
        bail!("invalid book: {}", reasons.join("; "));
    }
    let saved = app.service().save_book(&dto).await.map_err(user_error)?;
    print_json(&saved)
}

/// Lead with the message a user would see, keep the typed error as cause.
fn user_error(err: BookError) -> anyhow::Error {
    let message = classify(&err);
    anyhow::Error::new(err).context(message.detail)
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{text}");
    Ok(())
}
