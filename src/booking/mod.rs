//! Покупка билетов: генерация плана зала, цены секций, выбор мест,
//! льготная скидка и двухшаговое оформление.

pub mod checkout;
pub mod pricing;
pub mod privilege;
pub mod seat_map;
pub mod section;
pub mod selection;

pub use checkout::{CheckoutError, CheckoutPhase, CheckoutSession, PaymentDraftPatch, PurchaseConfirmation};
pub use pricing::{PriceTable, ProfitReport};
pub use privilege::PrivilegeStatus;
pub use seat_map::{Seat, SeatMap};
pub use section::SectionId;
pub use selection::ToggleOutcome;
