pub mod crm;
pub mod payment_link;

pub use crm::{create_event_handlers, CrmError, CrmNotifier};
pub use payment_link::FormPaymentLinkProvider;
