//! Business logic services

pub mod auth;
pub mod bundle;
pub mod category;
pub mod company;
pub mod ledger;
pub mod product;
pub mod purchase_order;
pub mod reconciliation;
pub mod sales_invoice;
pub mod scope;
pub mod sequence;

pub use auth::AuthService;
pub use bundle::BundleService;
pub use category::CategoryService;
pub use company::CompanyService;
pub use ledger::LedgerService;
pub use product::ProductService;
pub use purchase_order::PurchaseOrderService;
pub use sales_invoice::SalesInvoiceService;
