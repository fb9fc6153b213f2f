//! Data models for the laundry orchestrator

/// Store a string-backed enum as a TEXT column.
///
/// The type must provide `as_str()` and `FromStr<Err = String>`.
macro_rules! text_column {
    ($ty:ty) => {
        impl sqlx::Type<sqlx::Postgres> for $ty {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $ty {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s: String = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $ty {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }
    };
}

pub(crate) use text_column;

pub mod analytics;
pub mod booking;
pub mod resource;
pub mod user;
pub mod waitlist;

// Re-export commonly used types
pub use booking::{Booking, BookingRow, BookingState, BookingStatus, NewBooking, TimeSlot};
pub use resource::{LiveState, LiveStatus, Resource, ResourceType};
pub use user::{Role, UserClaims};
pub use waitlist::{WaitlistEntry, WaitlistStatus};
