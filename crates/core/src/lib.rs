pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod rating;

pub use domain::notification::{Notification, NotificationId, NotificationKind};
pub use domain::order::{Order, OrderId, OrderLine, OrderStatus, OrderStatusRecord};
pub use domain::product::{Product, ProductId, ProductVariant, VariantId};
pub use domain::shop::{ReminderPeriod, Shop, ShopId};
pub use domain::user::{Role, User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use rating::service::{RatingService, SalesSource, SalesSourceError};
pub use rating::{quintile_rating, RankedEntity, SalesLeaderboard, MAX_STARS, MIN_STARS};
