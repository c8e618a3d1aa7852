use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeGroup {
    Personal,
    Phone,
    Postal,
    FreeText,
    Custom,
    ExtensionCustom,
    Flag,
}

impl std::fmt::Display for AttributeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Phone => write!(f, "phone"),
            Self::Postal => write!(f, "postal"),
            Self::FreeText => write!(f, "free_text"),
            Self::Custom => write!(f, "custom"),
            Self::ExtensionCustom => write!(f, "extension_custom"),
            Self::Flag => write!(f, "flag"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Collapse absent and whitespace-only values to `None`.
///
/// Non-blank values are returned untouched: `" CEO"` and `"CEO"` are
/// different values, `""` and `"   "` are both empty.
pub fn normalize(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Attribute set
// ---------------------------------------------------------------------------

/// Declares the mutable attribute set once and derives from it:
/// - `Attribute`, the enum whose declaration order is the comparison order
/// - `ContactAttributes`, one `Option<String>` per attribute
/// - accessors that map between the two without a property bag
macro_rules! contact_attributes {
    ($( $variant:ident => $field:ident : $group:ident ),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum Attribute {
            $( $variant, )*
        }

        impl Attribute {
            /// Every mutable attribute, in declared order.
            pub const ALL: &'static [Attribute] = &[ $( Attribute::$variant, )* ];

            /// Directory-side attribute name (also the serialized key).
            pub fn name(&self) -> &'static str {
                match self {
                    $( Attribute::$variant => stringify!($variant), )*
                }
            }

            pub fn group(&self) -> AttributeGroup {
                match self {
                    $( Attribute::$variant => AttributeGroup::$group, )*
                }
            }

            pub fn from_name(name: &str) -> Option<Attribute> {
                match name {
                    $( stringify!($variant) => Some(Attribute::$variant), )*
                    _ => None,
                }
            }
        }

        #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "PascalCase")]
        pub struct ContactAttributes {
            $(
                #[serde(default, skip_serializing_if = "Option::is_none")]
                pub $field: Option<String>,
            )*
        }

        impl ContactAttributes {
            /// Raw stored value, not normalized.
            pub fn get(&self, attr: Attribute) -> Option<&str> {
                match attr {
                    $( Attribute::$variant => self.$field.as_deref(), )*
                }
            }

            pub fn set(&mut self, attr: Attribute, value: Option<String>) {
                match attr {
                    $( Attribute::$variant => self.$field = value, )*
                }
            }
        }
    };
}

contact_attributes! {
    // Personal
    FirstName => first_name: Personal,
    Initials => initials: Personal,
    LastName => last_name: Personal,
    Title => title: Personal,
    Department => department: Personal,
    Company => company: Personal,
    Office => office: Personal,
    Manager => manager: Personal,
    SimpleDisplayName => simple_display_name: Personal,
    PhoneticDisplayName => phonetic_display_name: Personal,
    // Phone
    Phone => phone: Phone,
    MobilePhone => mobile_phone: Phone,
    HomePhone => home_phone: Phone,
    OtherHomePhone => other_home_phone: Phone,
    OtherTelephone => other_telephone: Phone,
    Fax => fax: Phone,
    OtherFax => other_fax: Phone,
    Pager => pager: Phone,
    TelephoneAssistant => telephone_assistant: Phone,
    // Postal
    StreetAddress => street_address: Postal,
    City => city: Postal,
    StateOrProvince => state_or_province: Postal,
    PostalCode => postal_code: Postal,
    CountryOrRegion => country_or_region: Postal,
    PostOfficeBox => post_office_box: Postal,
    // Free text
    Notes => notes: FreeText,
    WebPage => web_page: FreeText,
    AssistantName => assistant_name: FreeText,
    // Custom attribute slots
    CustomAttribute1 => custom_attribute1: Custom,
    CustomAttribute2 => custom_attribute2: Custom,
    CustomAttribute3 => custom_attribute3: Custom,
    CustomAttribute4 => custom_attribute4: Custom,
    CustomAttribute5 => custom_attribute5: Custom,
    CustomAttribute6 => custom_attribute6: Custom,
    CustomAttribute7 => custom_attribute7: Custom,
    CustomAttribute8 => custom_attribute8: Custom,
    CustomAttribute9 => custom_attribute9: Custom,
    CustomAttribute10 => custom_attribute10: Custom,
    CustomAttribute11 => custom_attribute11: Custom,
    CustomAttribute12 => custom_attribute12: Custom,
    CustomAttribute13 => custom_attribute13: Custom,
    CustomAttribute14 => custom_attribute14: Custom,
    CustomAttribute15 => custom_attribute15: Custom,
    // Extended custom attribute slots
    ExtensionCustomAttribute1 => extension_custom_attribute1: ExtensionCustom,
    ExtensionCustomAttribute2 => extension_custom_attribute2: ExtensionCustom,
    ExtensionCustomAttribute3 => extension_custom_attribute3: ExtensionCustom,
    ExtensionCustomAttribute4 => extension_custom_attribute4: ExtensionCustom,
    ExtensionCustomAttribute5 => extension_custom_attribute5: ExtensionCustom,
    // Visibility / security
    HiddenFromAddressListsEnabled => hidden_from_address_lists_enabled: Flag,
    RequireSenderAuthenticationEnabled => require_sender_authentication_enabled: Flag,
}

impl Attribute {
    /// Attributes the directory accepts on the create call itself. The rest
    /// are applied by a follow-up update.
    pub fn is_creation_field(&self) -> bool {
        matches!(self, Self::FirstName | Self::Initials | Self::LastName)
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl ContactAttributes {
    /// Normalized value: `None` for absent or whitespace-only.
    pub fn value(&self, attr: Attribute) -> Option<&str> {
        normalize(self.get(attr))
    }

    /// Non-empty values in declared order.
    pub fn non_empty(&self) -> impl Iterator<Item = (Attribute, &str)> + '_ {
        Attribute::ALL
            .iter()
            .filter_map(move |attr| self.value(*attr).map(|v| (*attr, v)))
    }

    /// True when every attribute normalizes to empty.
    pub fn is_blank(&self) -> bool {
        self.non_empty().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
