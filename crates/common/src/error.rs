//! Message-constructible errors and the `.context()` helpers built on them.

/// An error that can stand in for a failed lookup or decode step.
///
/// `parlor-sessions` maps it to `Error::Message` (malformed profile rows) and
/// `parlor-nlu` to `Error::Store` (values whose entity is not mirrored yet).
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Expands to a `Context` trait for the calling crate's `Result` and `Option`.
///
/// Needs `Error: FromMessage` and a `Result<T>` alias in scope. The context
/// string becomes the prefix of the wrapped error's message.
///
/// ```ignore
/// // crates/nlu/src/error.rs
/// parlor_common::impl_context!();
///
/// // crates/nlu/src/store.rs
/// let entity = self.entity(&value.entity_id).with_context(|| format!("no entity {}", value.entity_id))?;
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    mod scoped {
        use super::super::FromMessage;

        #[derive(Debug)]
        pub struct Error(pub String);

        impl FromMessage for Error {
            fn from_message(message: String) -> Self {
                Self(message)
            }
        }

        pub type Result<T> = std::result::Result<T, Error>;

        crate::impl_context!();
    }

    #[test]
    fn context_prefixes_result_errors() {
        use scoped::Context;

        let res: Result<(), &str> = Err("boom");
        let err = res.context("loading profile").err().map(|e| e.0);
        assert_eq!(err.as_deref(), Some("loading profile: boom"));
    }

    #[test]
    fn context_on_none_uses_message() {
        use scoped::Context;

        let missing: Option<u8> = None;
        let err = missing.with_context(|| "no session").err().map(|e| e.0);
        assert_eq!(err.as_deref(), Some("no session"));
    }
}
