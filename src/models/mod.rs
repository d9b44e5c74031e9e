use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown choice value: '{0}'")]
pub struct UnknownChoice(pub String);

/// Declares a closed set of stored choice codes together with their display
/// label and CSS colour class. The code is what goes into the database.
macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($code:literal, $label:literal, $color:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn color_class(&self) -> &'static str {
                match self {
                    $($name::$variant => $color),+
                }
            }

            /// `(code, label)` pairs, used to build `<select>` inputs.
            pub fn choices() -> Vec<(&'static str, &'static str)> {
                Self::ALL.iter().map(|c| (c.as_str(), c.label())).collect()
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err(UnknownChoice(other.to_string())),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        // Templates and the JSON API both want the derived label and colour
        // next to the raw code.
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                let mut state = serializer.serialize_struct(stringify!($name), 3)?;
                state.serialize_field("value", self.as_str())?;
                state.serialize_field("label", self.label())?;
                state.serialize_field("color", self.color_class())?;
                state.end()
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: UnknownChoice| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

choice_enum! {
    /// Lifecycle state of a portfolio project.
    ProjectStatus {
        InProgress => ("en_cours", "In progress", "bg-orange-500"),
        Launched => ("lance", "Launched", "bg-green-500"),
        Beta => ("beta", "Beta", "bg-blue-500"),
        Finished => ("termine", "Finished", "bg-gray-500"),
        Paused => ("pause", "Paused", "bg-red-500"),
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        ProjectStatus::InProgress
    }
}

choice_enum! {
    /// Where a news item was originally published.
    NewsPlatform {
        Facebook => ("facebook", "Facebook", "bg-blue-600"),
        LinkedIn => ("linkedin", "LinkedIn", "bg-blue-700"),
        Twitter => ("twitter", "Twitter", "bg-blue-400"),
        Instagram => ("instagram", "Instagram", "bg-pink-500"),
        Blog => ("blog", "Blog", "bg-gray-600"),
        YouTube => ("youtube", "YouTube", "bg-red-600"),
    }
}

impl NewsPlatform {
    /// Hex value of the badge colour shown in the back office.
    pub fn badge_hex(&self) -> &'static str {
        match self {
            NewsPlatform::Facebook => "#2563eb",
            NewsPlatform::LinkedIn => "#1d4ed8",
            NewsPlatform::Twitter => "#60a5fa",
            NewsPlatform::Instagram => "#ec4899",
            NewsPlatform::Blog => "#4b5563",
            NewsPlatform::YouTube => "#dc2626",
        }
    }
}

choice_enum! {
    SocialPlatform {
        Facebook => ("facebook", "Facebook", "bg-blue-600 hover:bg-blue-700"),
        Instagram => ("instagram", "Instagram", "bg-pink-600 hover:bg-pink-700"),
        LinkedIn => ("linkedin", "LinkedIn", "bg-blue-700 hover:bg-blue-800"),
        Twitter => ("twitter", "Twitter", "bg-blue-400 hover:bg-blue-500"),
        WhatsApp => ("whatsapp", "WhatsApp", "bg-green-500 hover:bg-green-600"),
        Email => ("email", "Email", "bg-red-500 hover:bg-red-600"),
        YouTube => ("youtube", "YouTube", "bg-red-600 hover:bg-red-700"),
        GitHub => ("github", "GitHub", "bg-gray-800 hover:bg-gray-900"),
        TikTok => ("tiktok", "TikTok", "bg-black hover:bg-gray-800"),
    }
}

impl SocialPlatform {
    pub fn icon_class(&self) -> &'static str {
        match self {
            SocialPlatform::Facebook => "fab fa-facebook",
            SocialPlatform::Instagram => "fab fa-instagram",
            SocialPlatform::LinkedIn => "fab fa-linkedin",
            SocialPlatform::Twitter => "fab fa-twitter",
            SocialPlatform::WhatsApp => "fab fa-whatsapp",
            SocialPlatform::Email => "fas fa-envelope",
            SocialPlatform::YouTube => "fab fa-youtube",
            SocialPlatform::GitHub => "fab fa-github",
            SocialPlatform::TikTok => "fab fa-tiktok",
        }
    }
}

// ====================================================================
// ============================ ENTITIES ==============================
// ====================================================================

#[derive(Debug, Serialize, Clone)]
pub struct Profile {
    pub id: i64,
    pub last_name: String,
    pub first_name: String,
    pub handle: String,
    pub title: String,
    pub bio: String,
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub description: String,
    pub image: String,
    pub status: ProjectStatus,
    pub technologies: Vec<String>,
    pub display_order: i64,
    pub featured: bool,
    pub demo_url: Option<String>,
    pub repo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn absolute_url(&self) -> String {
        format!("/projet/{}/", self.slug)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub icon_class: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct News {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub platform: NewsPlatform,
    pub published_at: DateTime<Utc>,
    pub display_order: i64,
}

#[derive(Debug, Serialize, Clone)]
pub struct Partner {
    pub id: i64,
    pub name: String,
    pub logo: String,
    pub site_url: Option<String>,
    pub description: String,
    pub display_order: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct GalleryItem {
    pub id: i64,
    pub image: String,
    pub title: String,
    pub slug: String,
    pub short_description: String,
    pub content: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

impl GalleryItem {
    pub fn absolute_url(&self) -> String {
        format!("/galerie/{}/", self.slug)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct FeedItem {
    pub id: i64,
    pub image: String,
    pub alt_text: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub active: bool,
    pub token: String,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub read: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct SocialLink {
    pub id: i64,
    pub platform: SocialPlatform,
    pub icon_class: &'static str,
    pub url: String,
    pub display_name: String,
    pub display_order: i64,
    pub active: bool,
    pub sidebar_contact: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ContactInfo {
    pub id: i64,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub whatsapp: String,
    pub whatsapp_url: Option<String>,
    pub linkedin_url: String,
    pub show_sidebar: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Builds a wa.me deep link. Local numbers starting with `0` get the Congo
/// country code.
pub fn whatsapp_url(number: &str) -> Option<String> {
    if number.trim().is_empty() {
        return None;
    }
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = match digits.strip_prefix('0') {
        Some(rest) => format!("242{}", rest),
        None => digits,
    };
    Some(format!("https://wa.me/{}", digits))
}

#[derive(Debug, Serialize, Clone)]
pub struct SiteSettings {
    pub id: i64,
    pub site_name: String,
    pub description: String,
    pub logo: String,
    pub favicon: String,
    pub primary_color: String,
    pub analytics_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub is_active: bool,
    pub last_login_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Notification {
    pub message: String,
    pub r#type: String, // 'success' or 'error'
}

// ====================================================================
// ========================= WRITE PAYLOADS ===========================
// ====================================================================
// Validated field sets for inserts and updates. Ids and timestamps are
// owned by the store.

#[derive(Debug, Clone)]
pub struct ProfileDraft {
    pub last_name: String,
    pub first_name: String,
    pub handle: String,
    pub title: String,
    pub bio: String,
    pub photo: String,
}

#[derive(Debug, Clone)]
pub struct ProjectDraft {
    pub title: String,
    /// `None` asks the store to derive one from the title.
    pub slug: Option<String>,
    pub short_description: String,
    pub description: String,
    pub image: String,
    pub status: ProjectStatus,
    pub technologies: Vec<String>,
    pub display_order: i64,
    pub featured: bool,
    pub demo_url: Option<String>,
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SkillDraft {
    pub name: String,
    pub description: String,
    pub icon_class: String,
    pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct NewsDraft {
    pub title: String,
    pub description: String,
    pub image: String,
    pub link: String,
    pub platform: NewsPlatform,
    pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct PartnerDraft {
    pub name: String,
    pub logo: String,
    pub site_url: Option<String>,
    pub description: String,
    pub display_order: i64,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct GalleryDraft {
    pub image: String,
    pub title: String,
    pub slug: Option<String>,
    pub short_description: String,
    pub content: String,
    pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct FeedDraft {
    pub image: String,
    pub alt_text: String,
    pub display_order: i64,
}

#[derive(Debug, Clone)]
pub struct SubscriberDraft {
    pub email: String,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct ContactMessageDraft {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub read: bool,
}

#[derive(Debug, Clone)]
pub struct SocialLinkDraft {
    pub platform: SocialPlatform,
    pub url: String,
    pub display_name: String,
    pub display_order: i64,
    pub active: bool,
    pub sidebar_contact: bool,
}

#[derive(Debug, Clone)]
pub struct ContactInfoDraft {
    pub phone: String,
    pub email: String,
    pub address: String,
    pub whatsapp: String,
    pub linkedin_url: String,
    pub show_sidebar: bool,
}

#[derive(Debug, Clone)]
pub struct SiteSettingsDraft {
    pub site_name: String,
    pub description: String,
    pub logo: String,
    pub favicon: String,
    pub primary_color: String,
    pub analytics_id: String,
}

impl Default for SiteSettingsDraft {
    fn default() -> Self {
        SiteSettingsDraft {
            site_name: "Portfolio".to_string(),
            description: "Professional portfolio".to_string(),
            logo: String::new(),
            favicon: String::new(),
            primary_color: "#e1306c".to_string(),
            analytics_id: String::new(),
        }
    }
}

pub mod db_operations;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_codes_parse_back() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>().unwrap(), *status);
        }
        assert!("archived".parse::<ProjectStatus>().is_err());
    }

    #[test]
    fn status_and_platform_colors() {
        assert_eq!(ProjectStatus::Launched.color_class(), "bg-green-500");
        assert_eq!(ProjectStatus::default(), ProjectStatus::InProgress);
        assert_eq!(NewsPlatform::Instagram.color_class(), "bg-pink-500");
        assert_eq!(SocialPlatform::Email.icon_class(), "fas fa-envelope");
    }

    #[test]
    fn choice_serializes_with_label_and_color() {
        let json = serde_json::to_value(ProjectStatus::Beta).unwrap();
        assert_eq!(json["value"], "beta");
        assert_eq!(json["label"], "Beta");
        assert_eq!(json["color"], "bg-blue-500");
    }

    #[test]
    fn whatsapp_link_normalizes_number() {
        assert_eq!(whatsapp_url("06 123 45 67").as_deref(), Some("https://wa.me/24261234567"));
        assert_eq!(whatsapp_url("+242 06-123").as_deref(), Some("https://wa.me/24206123"));
        assert_eq!(whatsapp_url("  "), None);
    }
}
