//! Dependency injection infrastructure.
//!
//! Services are built from an explicit [`Context`](crate::context::Context)
//! rather than from ambient globals.
//!
//! # Overview
//!
//! - `FromRef<T>`: Trait for extracting a value from a reference to `T`
//! - `context_fields!`: Makes each field of the context extractable
//! - `from_context!`: Generates a `FromRef<Context>` impl that resolves each field
//!
//! # Example
//!
//! ```ignore
//! #[derive(Clone)]
//! pub struct EdgeService {
//!     api: AppApi, // resolved via FromRef<Context>
//! }
//!
//! from_context!(EdgeService { api });
//!
//! let service = EdgeService::from_ref(&ctx);
//! ```

/// Trait for extracting a value from a reference to another type.
///
/// Types that implement `FromRef<T>` can be extracted from `&T`.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Blanket implementation: any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

/// Generate a `FromRef<$ctx>` impl for each listed field type.
///
/// Every field must be `Clone`.
#[macro_export]
macro_rules! context_fields {
    ($ctx:ident { $($field:ident: $ty:ty),* $(,)? }) => {
        $(
            impl $crate::di::FromRef<$ctx> for $ty {
                fn from_ref(ctx: &$ctx) -> Self {
                    ctx.$field.clone()
                }
            }
        )*
    };
}

/// Implement `FromRef<Context>` for a struct whose fields all implement
/// `FromRef<Context>`.
///
/// Fields listed after a `;` are not shared: each resolution gets
/// `Default::default()`.
#[macro_export]
macro_rules! from_context {
    ($ty:ident { $($field:ident),* ; $($fresh:ident),* $(,)? }) => {
        impl $crate::di::FromRef<$crate::context::Context> for $ty {
            fn from_ref(ctx: &$crate::context::Context) -> Self {
                Self {
                    $($field: $crate::di::FromRef::from_ref(ctx),)*
                    $($fresh: ::core::default::Default::default(),)*
                }
            }
        }
    };
    ($ty:ident { $($field:ident),* $(,)? }) => {
        $crate::from_context!($ty { $($field),* ; });
    };
}
