//! Static factory registries mapping data-type keywords to handlers.
//!
//! A driver declares one registry per point class as a `static`, listing the
//! data types that class supports. The registry is built once, never mutated,
//! and consulted at load time to turn the configured `data_type` keyword into
//! a boxed handler. A keyword with no entry is a configuration error naming
//! the keyword.
//!
//! ```rust,ignore
//! static INPUT_HANDLERS: HandlerRegistry<HandlerSeed, dyn InputHandler> =
//!     HandlerRegistry::new(&[
//!         RegistryEntry::new("bool", new_input_handler::<bool>),
//!         RegistryEntry::new("float64", new_input_handler::<f64>),
//!     ]);
//! ```

use crate::error::ConfigError;

/// One keyword-to-factory mapping in a [`HandlerRegistry`].
pub struct RegistryEntry<C, H: ?Sized + 'static> {
    keyword: &'static str,
    factory: fn(C) -> Box<H>,
}

impl<C, H: ?Sized + 'static> RegistryEntry<C, H> {
    /// Creates an entry binding `keyword` to `factory`.
    pub const fn new(keyword: &'static str, factory: fn(C) -> Box<H>) -> Self {
        Self { keyword, factory }
    }
}

/// An immutable keyword-indexed set of handler factories.
///
/// `C` is the driver-specific seed a factory needs to build a handler (device
/// handle, point address, ...); `H` is the handler trait object the registry
/// produces.
pub struct HandlerRegistry<C: 'static, H: ?Sized + 'static> {
    entries: &'static [RegistryEntry<C, H>],
}

impl<C: 'static, H: ?Sized + 'static> HandlerRegistry<C, H> {
    /// Wraps a static entry table.
    pub const fn new(entries: &'static [RegistryEntry<C, H>]) -> Self {
        Self { entries }
    }

    /// Whether the registry has an entry for the keyword.
    pub fn supports(&self, keyword: &str) -> bool {
        self.entries.iter().any(|entry| entry.keyword == keyword)
    }

    /// The keywords this registry accepts, in declaration order.
    pub fn keywords(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.keyword)
    }

    /// Builds the handler registered for `keyword`.
    ///
    /// An unregistered keyword yields [`ConfigError::UnknownDataType`]; this
    /// is how an input rejects `data_type = "string"` while the output
    /// registry accepts it.
    pub fn create(&self, keyword: &str, seed: C) -> Result<Box<H>, ConfigError> {
        match self
            .entries
            .iter()
            .find(|entry| entry.keyword == keyword)
        {
            Some(entry) => Ok((entry.factory)(seed)),
            None => Err(ConfigError::UnknownDataType(keyword.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send {
        fn greet(&self) -> String;
    }

    struct Plain(&'static str);

    impl Greeter for Plain {
        fn greet(&self) -> String {
            format!("hello {}", self.0)
        }
    }

    struct Loud(&'static str);

    impl Greeter for Loud {
        fn greet(&self) -> String {
            format!("HELLO {}", self.0)
        }
    }

    fn new_plain(name: &'static str) -> Box<dyn Greeter> {
        Box::new(Plain(name))
    }

    fn new_loud(name: &'static str) -> Box<dyn Greeter> {
        Box::new(Loud(name))
    }

    static GREETERS: HandlerRegistry<&'static str, dyn Greeter> = HandlerRegistry::new(&[
        RegistryEntry::new("plain", new_plain),
        RegistryEntry::new("loud", new_loud),
    ]);

    #[test]
    fn test_creates_by_keyword() {
        let greeter = GREETERS.create("loud", "world").ok();
        assert_eq!(greeter.map(|g| g.greet()), Some("HELLO world".to_owned()));
    }

    #[test]
    fn test_unknown_keyword_is_a_config_error() {
        let error = GREETERS.create("silent", "world").err();
        assert_eq!(
            error,
            Some(ConfigError::UnknownDataType("silent".to_owned()))
        );
    }

    #[test]
    fn test_reports_supported_keywords() {
        assert!(GREETERS.supports("plain"));
        assert!(!GREETERS.supports("silent"));
        assert_eq!(GREETERS.keywords().collect::<Vec<_>>(), vec!["plain", "loud"]);
    }
}
