use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, Settings},
    session::{store_session, JWT_KEY},
    store::fixture_bills,
    BillStore, Element, FileSessionStore, HttpBillStore, InMemoryBillStore, MemoryRoot,
    MountedView, NewBillForm, Route, Router, SelectedFile, SessionStore, ViewRoot,
};
use shared::domain::Session;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "billed", about = "Billed expense reports from the terminal")]
struct Cli {
    /// Bills API base url; overrides settings.
    #[arg(long)]
    api_url: Option<String>,
    /// Session file; overrides settings.
    #[arg(long)]
    session_path: Option<PathBuf>,
    /// Serve sample bills from memory instead of the API.
    #[arg(long)]
    offline: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record who is signed in.
    Session {
        email: String,
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        token: Option<String>,
    },
    /// Render the landing page for the current session.
    Init,
    /// Render the page registered for a path, e.g. `#employee/bills`.
    Open { path: String },
    /// Submit a new bill with a receipt file.
    NewBill {
        #[arg(long)]
        receipt: PathBuf,
        #[arg(long, default_value = "Transports")]
        expense_type: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        date: String,
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        vat: String,
        #[arg(long, default_value = "")]
        pct: String,
        #[arg(long, default_value = "")]
        commentary: String,
    },
    /// Show the receipt modal for a bill on the list page.
    Receipt { bill_id: String },
}

fn mime_type_for(path: &str) -> Option<String> {
    let ext = path.rsplit('.').next()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg".to_string()),
        "png" => Some("image/png".to_string()),
        _ => None,
    }
}

fn build_router(
    cli: &Cli,
    settings: &Settings,
    session: Arc<FileSessionStore>,
    root: Arc<MemoryRoot>,
) -> Result<Arc<Router>> {
    let store: Arc<dyn BillStore> = if cli.offline {
        info!("serving sample bills from memory");
        Arc::new(InMemoryBillStore::with_bills(fixture_bills()))
    } else {
        Arc::new(HttpBillStore::new(&settings.api_url, session.clone())?)
    };
    Ok(Router::new_with_policy(
        store,
        session,
        root,
        settings.not_found,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(api_url) = &cli.api_url {
        settings.api_url = api_url.clone();
    }
    if let Some(session_path) = &cli.session_path {
        settings.session_path = session_path.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .with_writer(std::io::stderr)
        .init();

    let session = Arc::new(FileSessionStore::new(settings.session_path.clone()));
    let root = Arc::new(MemoryRoot::new());

    match &cli.command {
        Command::Session {
            email,
            admin,
            token,
        } => {
            let record = if *admin {
                Session::admin(email.clone())
            } else {
                Session::employee(email.clone())
            };
            store_session(session.as_ref(), &record)?;
            if let Some(token) = token {
                session.set(JWT_KEY, token)?;
            }
            println!("signed in as {email} ({})", session.path().display());
        }
        Command::Init => {
            let router = build_router(&cli, &settings, session, root.clone())?;
            let route = router.initialize().await?;
            info!(route = route.path(), "landed");
            println!("{}", root.content());
        }
        Command::Open { path } => {
            let router = build_router(&cli, &settings, session, root.clone())?;
            router.navigate(path).await?;
            println!("{}", root.content());
        }
        Command::NewBill {
            receipt,
            expense_type,
            name,
            date,
            amount,
            vat,
            pct,
            commentary,
        } => {
            let bytes = tokio::fs::read(receipt)
                .await
                .with_context(|| format!("failed to read receipt {}", receipt.display()))?;
            let path = receipt.to_string_lossy().into_owned();

            let router = build_router(&cli, &settings, session, root.clone())?;
            router.navigate_to(Route::NewBill).await?;
            let Some(MountedView::NewBill(new_bill)) = router.mounted().await else {
                bail!("new bill form is not mounted");
            };
            new_bill
                .handle_change_file(SelectedFile {
                    mime_type: mime_type_for(&path),
                    path,
                    bytes,
                })
                .await;
            let bill = new_bill
                .handle_submit(NewBillForm {
                    expense_type: expense_type.clone(),
                    name: name.clone(),
                    date: date.clone(),
                    amount: amount.clone(),
                    vat: vat.clone(),
                    pct: pct.clone(),
                    commentary: commentary.clone(),
                })
                .await?;
            println!("created bill {}", bill.id);
            println!("{}", root.content());
        }
        Command::Receipt { bill_id } => {
            let router = build_router(&cli, &settings, session, root.clone())?;
            router.navigate_to(Route::Bills).await?;
            let Some(MountedView::Bills(bills)) = router.mounted().await else {
                bail!("bills page did not load:\n{}", root.content());
            };
            let rows = bills.list().await?;
            let Some(row) = rows.iter().find(|row| row.bill.id.as_str() == bill_id) else {
                bail!("no bill with id {bill_id}");
            };
            let eye = Element::new()
                .with_attribute("data-testid", "icon-eye")
                .with_attribute(
                    "data-bill-url",
                    row.bill.file_url.clone().unwrap_or_default(),
                );
            bills.handle_click_icon_eye(&eye)?;
            println!("{}", root.modal().unwrap_or_default());
        }
    }

    Ok(())
}
