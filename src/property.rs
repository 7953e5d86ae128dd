//! Property helpers: field aliases and cached values.
//!
//! [`alias!`](crate::alias) and [`read_alias!`](crate::read_alias) expose a
//! field under a second name. Per-instance laziness needs nothing beyond a
//! [`once_cell::unsync::OnceCell`] field. The helpers here cover the two
//! cases that do: a value computed once and shared by every instance of a
//! type, and a value recomputed only when its inputs change.

use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

use once_cell::sync::OnceCell;

/// A value computed from the first instance that asks for it and then
/// shared by all instances.
///
/// The value should be immutable and independent of per-instance state;
/// whichever instance reaches it first decides it.
///
/// # Examples
///
/// ```
/// use tunables::LazyOnClass;
///
/// struct Catalog {
///     locale: &'static str,
/// }
///
/// static HEADER: LazyOnClass<Catalog, String> =
///     LazyOnClass::new(|catalog| format!("catalog ({})", catalog.locale));
///
/// let en = Catalog { locale: "en" };
/// let fr = Catalog { locale: "fr" };
/// assert_eq!(HEADER.get(&en), "catalog (en)");
/// assert_eq!(HEADER.get(&fr), "catalog (en)");
/// ```
pub struct LazyOnClass<O, T> {
    init: fn(&O) -> T,
    cell: OnceCell<T>,
    _owner: PhantomData<fn(&O)>,
}

impl<O, T> LazyOnClass<O, T> {
    pub const fn new(init: fn(&O) -> T) -> Self {
        Self { init, cell: OnceCell::new(), _owner: PhantomData }
    }

    /// Returns the shared value, computing it from `instance` if this is
    /// the first access.
    pub fn get(&self, instance: &O) -> &T {
        self.cell.get_or_init(|| (self.init)(instance))
    }

    pub fn is_initialized(&self) -> bool { self.cell.get().is_some() }
}

/// A cached value that is recomputed whenever its dependency key changes.
///
/// The key is typically a tuple of the fields the computation reads.
///
/// # Examples
///
/// ```
/// use tunables::CachedProperty;
///
/// let area = CachedProperty::new();
/// let mut calls = 0;
/// let mut compute = |(w, h): (u32, u32)| {
///     calls += 1;
///     w * h
/// };
///
/// assert_eq!(area.get_or_compute((2, 3), || compute((2, 3))), 6);
/// assert_eq!(area.get_or_compute((2, 3), || compute((2, 3))), 6);
/// assert_eq!(area.get_or_compute((4, 3), || compute((4, 3))), 12);
/// drop(compute);
/// assert_eq!(calls, 2);
/// ```
pub struct CachedProperty<K, T> {
    cache: Mutex<Option<(K, T)>>,
}

impl<K, T> CachedProperty<K, T> {
    pub const fn new() -> Self { Self { cache: Mutex::new(None) } }

    /// Forgets the cached value.
    pub fn invalidate(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl<K, T> CachedProperty<K, T>
where
    K: PartialEq,
    T: Clone,
{
    /// Returns the cached value if it was computed for `key`; otherwise
    /// runs `compute`, caches its result under `key`, and returns it.
    pub fn get_or_compute(&self, key: K, compute: impl FnOnce() -> T) -> T {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_key, value)) = cache.as_ref()
            && *cached_key == key
        {
            return value.clone();
        }
        let value = compute();
        *cache = Some((key, value.clone()));
        value
    }
}

impl<K, T> Default for CachedProperty<K, T> {
    fn default() -> Self { Self::new() }
}

/// Declares read-only accessors that expose a field under another name.
///
/// Each entry `NAME: Type => field;` generates `fn NAME(&self) -> &Type`
/// returning `&self.field`.
///
/// ```
/// use tunables::read_alias;
///
/// struct Account {
///     username: String,
/// }
///
/// read_alias! {
///     impl Account {
///         pub login: String => username;
///     }
/// }
///
/// let account = Account { username: "ada".to_string() };
/// assert_eq!(account.login(), "ada");
/// ```
#[macro_export]
macro_rules! read_alias {
    (
        impl $owner:ident {
            $(
                $(#[$meta:meta])*
                $vis:vis $name:ident : $ty:ty => $field:ident ;
            )*
        }
    ) => {
        impl $owner {
            $(
                $(#[$meta])*
                #[doc = ::core::concat!("Read-only alias for `", ::core::stringify!($field), "`.")]
                #[inline]
                $vis fn $name(&self) -> &$ty {
                    &self.$field
                }
            )*
        }
    };
}

/// Declares read/write accessors that expose a field under another name.
///
/// Each entry `NAME: Type => field;` generates `NAME(&self) -> &Type`,
/// `NAME_mut(&mut self) -> &mut Type` and `set_NAME(&mut self, Type)`, all
/// forwarding to `self.field`.
///
/// ```
/// use tunables::alias;
///
/// struct Account {
///     username: String,
/// }
///
/// alias! {
///     impl Account {
///         pub login: String => username;
///     }
/// }
///
/// let mut account = Account { username: "ada".to_string() };
/// account.set_login("grace".to_string());
/// account.login_mut().push_str("_h");
/// assert_eq!(account.login(), "grace_h");
/// assert_eq!(account.username, "grace_h");
/// ```
#[macro_export]
macro_rules! alias {
    (
        impl $owner:ident {
            $(
                $(#[$meta:meta])*
                $vis:vis $name:ident : $ty:ty => $field:ident ;
            )*
        }
    ) => {
        $crate::paste::paste! {
            impl $owner {
                $(
                    $(#[$meta])*
                    #[doc = ::core::concat!("Alias for `", ::core::stringify!($field), "`.")]
                    #[inline]
                    $vis fn $name(&self) -> &$ty {
                        &self.$field
                    }

                    #[doc = ::core::concat!("Mutable alias for `", ::core::stringify!($field), "`.")]
                    #[inline]
                    $vis fn [<$name _mut>](&mut self) -> &mut $ty {
                        &mut self.$field
                    }

                    #[doc = ::core::concat!("Replaces `", ::core::stringify!($field), "`.")]
                    #[inline]
                    $vis fn [<set_ $name>](&mut self, value: $ty) {
                        self.$field = value;
                    }
                )*
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct Widget {
        id: u32,
    }

    struct Contact {
        email: String,
        tags: Vec<String>,
        priority: u8,
    }

    crate::read_alias! {
        impl Contact {
            address: String => email;
            labels: Vec<String> => tags;
        }
    }

    crate::alias! {
        impl Contact {
            /// Scheduling weight.
            pub(crate) weight: u8 => priority;
            categories: Vec<String> => tags;
        }
    }

    fn contact() -> Contact {
        Contact { email: "a@example.com".into(), tags: vec!["x".into()], priority: 1 }
    }

    #[test]
    fn test_read_alias_returns_the_aliased_field() {
        let contact = contact();
        assert_eq!(contact.address(), "a@example.com");
        assert!(std::ptr::eq(contact.address(), &contact.email));
        assert_eq!(contact.labels(), &["x".to_string()]);
    }

    #[test]
    fn test_alias_reads_and_writes_through() {
        let mut contact = contact();
        assert_eq!(*contact.weight(), 1);
        contact.set_weight(7);
        assert_eq!(contact.priority, 7);

        contact.categories_mut().push("y".into());
        assert_eq!(contact.categories(), &["x".to_string(), "y".to_string()]);
        contact.set_categories(vec!["z".into()]);
        assert_eq!(contact.labels(), &["z".to_string()]);
    }

    #[test]
    fn test_lazy_on_class_shares_first_value() {
        let lazy: LazyOnClass<Widget, u32> = LazyOnClass::new(|widget| widget.id * 10);
        assert!(!lazy.is_initialized());
        assert_eq!(*lazy.get(&Widget { id: 1 }), 10);
        assert_eq!(*lazy.get(&Widget { id: 2 }), 10);
        assert!(lazy.is_initialized());
    }

    #[test]
    fn test_cached_property_recomputes_on_key_change() {
        let property = CachedProperty::new();
        let calls = Cell::new(0);
        let compute = |n: u32| {
            calls.set(calls.get() + 1);
            n + 1
        };
        assert_eq!(property.get_or_compute(1, || compute(1)), 2);
        assert_eq!(property.get_or_compute(1, || compute(1)), 2);
        assert_eq!(calls.get(), 1);
        assert_eq!(property.get_or_compute(5, || compute(5)), 6);
        assert_eq!(calls.get(), 2);

        property.invalidate();
        assert_eq!(property.get_or_compute(5, || compute(5)), 6);
        assert_eq!(calls.get(), 3);
    }
}
