//! Macros for defining kind enums.
//!
//! A kind enum is a closed set of variants stored as `INT2` in Postgres and
//! exposed as a `SCREAMING_SNAKE_CASE` string everywhere else.

/// Macro for defining a kind enum.
///
/// # Example
///
/// ```rust
/// # use common::define_kind;
/// define_kind! {
///     #[doc = "Shape kind."]
///     enum Kind {
///         #[doc = "A cube"]
///         Cube = 1,
///
///         #[doc = "A sphere"]
///         Sphere = 2,
///     }
/// }
///
/// assert_eq!(Kind::Cube.as_str(), "CUBE");
/// assert_eq!("SPHERE".parse::<Kind>().unwrap(), Kind::Sphere);
/// assert_eq!(Kind::ALL.len(), 2);
/// ```
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_kind {
    (
        #[doc = $doc:literal]
        enum $name:ident {
            $(
                #[doc = $variant_doc:literal]
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            $crate::private::strum::Display,
            $crate::private::strum::EnumString,
            $crate::private::strum::IntoStaticStr,
            Eq,
            Hash,
            PartialEq,
        )]
        #[doc = $doc]
        #[repr(u8)]
        #[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $(
                 #[doc = $variant_doc]
                 $variant = $value,
            )*
        }

        impl $name {
            /// All the variants, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),*];

            /// Converts this into its [`u8`] representation.
            #[must_use]
            pub const fn u8(self) -> u8 {
                self as u8
            }

            /// Returns the `SCREAMING_SNAKE_CASE` name of this variant.
            #[must_use]
            pub fn as_str(self) -> &'static str {
                self.into()
            }
        }

        impl TryFrom<u8> for $name {
            type Error = u8;

            fn try_from(v: u8) -> Result<Self, Self::Error> {
                match v {
                    $(
                        v if Self::$variant.u8() == v => Ok(Self::$variant),
                    )*
                    v => Err(v),
                }
            }
        }

        $crate::__kind_serde!($name);
        $crate::__kind_postgres!($name);
    };
}

#[cfg(feature = "serde")]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_serde {
    ($name:ident) => {
        impl $crate::private::serde::Serialize for $name {
            fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
            where
                S: $crate::private::serde::Serializer,
            {
                s.serialize_str(self.as_str())
            }
        }

        impl<'de> $crate::private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(d: D) -> Result<Self, D::Error>
            where
                D: $crate::private::serde::Deserializer<'de>,
            {
                use $crate::private::serde::de::Error as _;

                let raw = <::std::string::String as $crate::private::serde::Deserialize>::deserialize(d)?;
                raw.parse().map_err(|_| {
                    D::Error::custom(::std::format!(
                        "unknown `{}` variant: `{raw}`",
                        ::core::stringify!($name),
                    ))
                })
            }
        }
    };
}

#[cfg(not(feature = "serde"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_serde {
    ($name:ident) => {};
}

#[cfg(feature = "postgres")]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_postgres {
    ($name:ident) => {
        impl<'a> $crate::private::postgres_types::FromSql<'a> for $name {
            $crate::private::postgres_types::accepts!(INT2);

            fn from_sql(
                ty: &$crate::private::postgres_types::Type,
                raw: &[u8],
            ) -> Result<
                $name,
                Box<dyn ::std::error::Error
                    + ::core::marker::Sync
                    + ::core::marker::Send>,
            > {
                let v = u8::try_from(i16::from_sql(ty, raw)?)?;
                Self::try_from(v).map_err(|v| {
                    ::std::format!(
                        "invalid `{}` value: {v}",
                        ::core::stringify!($name),
                    )
                    .into()
                })
            }
        }

        impl $crate::private::postgres_types::ToSql for $name {
            $crate::private::postgres_types::accepts!(INT2);
            $crate::private::postgres_types::to_sql_checked!();

            fn to_sql(
                &self,
                ty: &$crate::private::postgres_types::Type,
                w: &mut $crate::private::postgres_types::private::BytesMut,
            ) -> Result<
                $crate::private::postgres_types::IsNull,
                ::std::boxed::Box<
                    dyn ::std::error::Error
                        + ::core::marker::Sync
                        + ::core::marker::Send
                >,
            > {
                i16::from(self.u8()).to_sql(ty, w)
            }
        }
    };
}

#[cfg(not(feature = "postgres"))]
#[doc(hidden)]
#[macro_export]
macro_rules! __kind_postgres {
    ($name:ident) => {};
}

#[cfg(test)]
mod spec {
    crate::define_kind! {
        #[doc = "Test kind."]
        enum Frequency {
            #[doc = "Once."]
            OneTime = 1,

            #[doc = "Every other week."]
            Biweekly = 3,
        }
    }

    #[test]
    fn uses_screaming_snake_case() {
        assert_eq!(Frequency::OneTime.as_str(), "ONE_TIME");
        assert_eq!(Frequency::Biweekly.to_string(), "BIWEEKLY");
        assert_eq!("ONE_TIME".parse::<Frequency>().unwrap(), Frequency::OneTime);
        assert!("one_time".parse::<Frequency>().is_err());
    }

    #[test]
    fn converts_from_u8() {
        assert_eq!(Frequency::try_from(3), Ok(Frequency::Biweekly));
        assert_eq!(Frequency::try_from(2), Err(2));
        assert_eq!(Frequency::ALL, &[Frequency::OneTime, Frequency::Biweekly]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serializes_as_string() {
        assert_eq!(
            serde_json::to_string(&Frequency::OneTime).unwrap(),
            "\"ONE_TIME\"",
        );
        assert_eq!(
            serde_json::from_str::<Frequency>("\"BIWEEKLY\"").unwrap(),
            Frequency::Biweekly,
        );
        assert!(serde_json::from_str::<Frequency>("\"DAILY\"").is_err());
    }
}
