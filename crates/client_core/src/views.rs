//! Pure markup renderers. No I/O; every page is an askama template.

use askama::Template;
use shared::domain::{Bill, BillStatus};
use thiserror::Error;

use crate::{containers::bills::BillRow, dom::Icon, format};

pub const EXPENSE_TYPES: [&str; 7] = [
    "Transports",
    "Restaurants et bars",
    "Hôtel et logement",
    "Services en ligne",
    "IT et électronique",
    "Equipement et matériel",
    "Fournitures de bureau",
];

#[derive(Debug, Error)]
#[error("failed to render {view}: {source}")]
pub struct ViewError {
    pub view: &'static str,
    #[source]
    pub source: askama::Error,
}

fn render<T: Template>(view: &'static str, template: &T) -> Result<String, ViewError> {
    template
        .render()
        .map_err(|source| ViewError { view, source })
}

/// Which navigation bar a page is framed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navbar {
    Employee { active: Option<Icon> },
    Admin,
}

struct NavIcon {
    test_id: &'static str,
    active: bool,
}

#[derive(Template)]
#[template(path = "navbar.html")]
struct NavbarTemplate {
    icons: Vec<NavIcon>,
}

fn navbar(kind: Navbar) -> Result<String, ViewError> {
    let icons = match kind {
        Navbar::Employee { active } => Icon::ALL
            .into_iter()
            .map(|icon| NavIcon {
                test_id: icon.test_id(),
                active: active == Some(icon),
            })
            .collect(),
        Navbar::Admin => Vec::new(),
    };
    render("navbar", &NavbarTemplate { icons })
}

/// Input of [`bills_ui`]: loading and error take precedence over data.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillsPage<'a> {
    pub data: &'a [BillRow],
    pub loading: bool,
    pub error: Option<&'a str>,
}

impl<'a> BillsPage<'a> {
    pub fn loading() -> Self {
        Self {
            data: &[],
            loading: true,
            error: None,
        }
    }

    pub fn loaded(data: &'a [BillRow]) -> Self {
        Self {
            data,
            loading: false,
            error: None,
        }
    }

    pub fn failed(error: &'a str) -> Self {
        Self {
            data: &[],
            loading: false,
            error: Some(error),
        }
    }
}

struct BillRowView<'a> {
    id: &'a str,
    expense_type: &'a str,
    name: &'a str,
    date: &'a str,
    amount: String,
    status: &'a str,
    file_url: &'a str,
}

#[derive(Template)]
#[template(path = "bills.html")]
struct BillsTemplate<'a> {
    navbar: String,
    rows: Vec<BillRowView<'a>>,
}

#[derive(Template)]
#[template(path = "loading.html")]
struct LoadingTemplate {
    navbar: String,
}

pub fn bills_ui(page: &BillsPage<'_>) -> Result<String, ViewError> {
    let bar = Navbar::Employee {
        active: Some(Icon::Window),
    };
    if page.loading {
        return render(
            "loading",
            &LoadingTemplate {
                navbar: navbar(bar)?,
            },
        );
    }
    if let Some(message) = page.error {
        return error_page(message, bar);
    }

    let rows = page
        .data
        .iter()
        .map(|row| BillRowView {
            id: row.bill.id.as_str(),
            expense_type: &row.bill.expense_type,
            name: &row.bill.name,
            date: &row.display_date,
            amount: format_amount(row.bill.amount),
            status: row.status_label,
            file_url: row.bill.file_url.as_deref().unwrap_or_default(),
        })
        .collect();
    render(
        "bills",
        &BillsTemplate {
            navbar: navbar(bar)?,
            rows,
        },
    )
}

#[derive(Template)]
#[template(path = "new_bill.html")]
struct NewBillTemplate<'a> {
    navbar: String,
    expense_types: &'a [&'a str],
}

pub fn new_bill_ui() -> Result<String, ViewError> {
    render(
        "new_bill",
        &NewBillTemplate {
            navbar: navbar(Navbar::Employee {
                active: Some(Icon::Mail),
            })?,
            expense_types: &EXPENSE_TYPES,
        },
    )
}

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate;

pub fn login_ui() -> Result<String, ViewError> {
    render("login", &LoginTemplate)
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    navbar: String,
    message: &'a str,
}

pub fn error_page(message: &str, bar: Navbar) -> Result<String, ViewError> {
    render(
        "error",
        &ErrorTemplate {
            navbar: navbar(bar)?,
            message,
        },
    )
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate<'a> {
    path: &'a str,
}

pub fn not_found_page(path: &str) -> Result<String, ViewError> {
    render("not_found", &NotFoundTemplate { path })
}

#[derive(Template)]
#[template(path = "receipt_modal.html")]
struct ReceiptModalTemplate<'a> {
    has_receipt: bool,
    url: &'a str,
    width: u32,
}

/// Modal body for a receipt; `None` renders the empty placeholder.
pub fn receipt_modal(url: Option<&str>, width: u32) -> Result<String, ViewError> {
    render(
        "receipt_modal",
        &ReceiptModalTemplate {
            has_receipt: url.is_some(),
            url: url.unwrap_or_default(),
            width,
        },
    )
}

struct DashboardCard<'a> {
    id: &'a str,
    email: &'a str,
    name: &'a str,
    amount: String,
    date: String,
    expense_type: &'a str,
}

struct DashboardGroup<'a> {
    status: &'static str,
    title: &'static str,
    count: usize,
    cards: Vec<DashboardCard<'a>>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    navbar: String,
    groups: Vec<DashboardGroup<'a>>,
}

fn dashboard_title(status: BillStatus) -> &'static str {
    match status {
        BillStatus::Pending => "En attente",
        BillStatus::Accepted => "Validé",
        BillStatus::Refused => "Refusé",
    }
}

/// Admin overview: every bill, grouped by status.
pub fn dashboard_ui(bills: &[Bill]) -> Result<String, ViewError> {
    let groups = BillStatus::ALL
        .into_iter()
        .map(|status| {
            let cards: Vec<_> = bills
                .iter()
                .filter(|bill| bill.status == status)
                .map(|bill| DashboardCard {
                    id: bill.id.as_str(),
                    email: &bill.email,
                    name: &bill.name,
                    amount: format_amount(bill.amount),
                    date: format::display_date(&bill.date),
                    expense_type: &bill.expense_type,
                })
                .collect();
            DashboardGroup {
                status: status.as_str(),
                title: dashboard_title(status),
                count: cards.len(),
                cards,
            }
        })
        .collect();
    render(
        "dashboard",
        &DashboardTemplate {
            navbar: navbar(Navbar::Admin)?,
            groups,
        },
    )
}

fn format_amount(amount: f64) -> String {
    amount.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bills_page_highlights_window_icon() {
        let markup = bills_ui(&BillsPage::loaded(&[])).expect("render");
        assert!(markup.contains("Mes notes de frais"));
        assert!(markup.contains(r#"data-testid="icon-window" class="active-icon""#));
        assert!(!markup.contains(r#"data-testid="icon-mail" class="active-icon""#));
    }

    #[test]
    fn employee_navbar_lists_icons_in_order() {
        let markup = navbar(Navbar::Employee {
            active: Some(Icon::Mail),
        })
        .expect("render");
        let window = markup
            .find(r#"id="layout-icon1" data-testid="icon-window""#)
            .expect("window icon");
        let mail = markup
            .find(r#"id="layout-icon2" data-testid="icon-mail" class="active-icon""#)
            .expect("mail icon");
        assert!(window < mail);

        let admin = navbar(Navbar::Admin).expect("render");
        for icon in Icon::ALL {
            assert!(!admin.contains(icon.test_id()));
        }
    }

    #[test]
    fn loading_and_error_take_precedence_over_rows() {
        let loading = bills_ui(&BillsPage::loading()).expect("render");
        assert!(loading.contains("Loading..."));

        let failed = bills_ui(&BillsPage::failed("Erreur 404")).expect("render");
        assert!(failed.contains("Erreur 404"));
        assert!(!failed.contains("Mes notes de frais"));
    }

    #[test]
    fn new_bill_form_lists_expense_types_and_highlights_mail_icon() {
        let markup = new_bill_ui().expect("render");
        assert!(markup.contains("Envoyer une note de frais"));
        assert!(markup.contains("<option>Hôtel et logement</option>"));
        assert!(markup.contains(r#"data-testid="icon-mail" class="active-icon""#));
    }

    #[test]
    fn receipt_modal_without_url_renders_placeholder() {
        let with_url = receipt_modal(Some("https://test.storage.tld/receipt.jpg"), 400)
            .expect("render");
        assert!(with_url.contains("Justificatif"));
        assert!(with_url.contains(r#"alt="Bill""#));
        assert!(with_url.contains(r#"width="400""#));

        let placeholder = receipt_modal(None, 400).expect("render");
        assert!(placeholder.contains("Justificatif"));
        assert!(placeholder.contains("Aucun justificatif"));
        assert!(!placeholder.contains("<img"));
    }

    #[test]
    fn markup_escapes_user_text() {
        let markup = error_page("<script>alert(1)</script>", Navbar::Admin).expect("render");
        assert!(!markup.contains("<script>"));
        assert!(!markup.contains("icon-window"));
    }
}
