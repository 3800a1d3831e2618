//! Admin-console content over the parish REST API.
//!
//! Every collection the console manages is a [`Resource`]: a JSON document at
//! a fixed path with a typed id. Reads are cached for 5 minutes; a write
//! invalidates the collection listing and the touched item.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use moka::future::Cache;
use parish_core::{
    AnnouncementId, EventId, GalleryItemId, LiturgicalColor, MassScheduleId, MinistryId,
    OverrideId, SermonId, UserId, UserRole,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::api::ApiClient;
use crate::error::{ClientError, Result};

/// A collection managed through the admin console.
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Collection path under the API root.
    const PATH: &'static str;

    type Id: AsRef<str> + fmt::Display + Send + Sync;
}

// =============================================================================
// Resources
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<AnnouncementId>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Announcement {
    const PATH: &'static str = "announcements";
    type Id = AnnouncementId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<EventId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Event {
    const PATH: &'static str = "events";
    type Id = EventId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ministry {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<MinistryId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meeting_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Ministry {
    const PATH: &'static str = "ministries";
    type Id = MinistryId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<GalleryItemId>,
    pub title: String,
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for GalleryItem {
    const PATH: &'static str = "gallery";
    type Id = GalleryItemId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sermon {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<SermonId>,
    pub title: String,
    #[serde(default)]
    pub preacher: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Sermon {
    const PATH: &'static str = "sermons";
    type Id = SermonId;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MassSchedule {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<MassScheduleId>,
    pub day_of_week: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for MassSchedule {
    const PATH: &'static str = "mass-schedules";
    type Id = MassScheduleId;
}

/// A user account as listed in the admin console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const fn default_true() -> bool {
    true
}

impl Resource for UserRecord {
    const PATH: &'static str = "users";
    type Id = UserId;
}

/// A manual color for one date, taking precedence over the computed calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiturgicalColorOverride {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<OverrideId>,
    pub date: NaiveDate,
    pub color: LiturgicalColor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Resource for LiturgicalColorOverride {
    const PATH: &'static str = "liturgical-color-overrides";
    type Id = OverrideId;
}

// =============================================================================
// ContentKind
// =============================================================================

/// Every collection reachable by name, for untyped listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Announcements,
    Events,
    Ministries,
    Gallery,
    Sermons,
    MassSchedules,
    Donations,
    Users,
    ColorOverrides,
}

impl ContentKind {
    pub const ALL: [Self; 9] = [
        Self::Announcements,
        Self::Events,
        Self::Ministries,
        Self::Gallery,
        Self::Sermons,
        Self::MassSchedules,
        Self::Donations,
        Self::Users,
        Self::ColorOverrides,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Announcements => Announcement::PATH,
            Self::Events => Event::PATH,
            Self::Ministries => Ministry::PATH,
            Self::Gallery => GalleryItem::PATH,
            Self::Sermons => Sermon::PATH,
            Self::MassSchedules => MassSchedule::PATH,
            Self::Donations => crate::donation::DonationRecord::PATH,
            Self::Users => UserRecord::PATH,
            Self::ColorOverrides => LiturgicalColorOverride::PATH,
        }
    }

    /// Collections only staff may read.
    #[must_use]
    pub const fn is_admin_only(self) -> bool {
        matches!(self, Self::Donations | Self::Users)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Announcements => "announcements",
            Self::Events => "events",
            Self::Ministries => "ministries",
            Self::Gallery => "gallery",
            Self::Sermons => "sermons",
            Self::MassSchedules => "mass-schedules",
            Self::Donations => "donations",
            Self::Users => "users",
            Self::ColorOverrides => "color-overrides",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| format!("Unknown content kind: {s}"))
    }
}

// =============================================================================
// ContentClient
// =============================================================================

/// Cached CRUD over the admin-console collections.
#[derive(Clone)]
pub struct ContentClient {
    api: ApiClient,
    cache: Cache<String, Value>,
}

impl ContentClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();
        Self { api, cache }
    }

    /// List a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or an item does not decode.
    #[instrument(skip_all, fields(path = R::PATH))]
    pub async fn list<R: Resource>(&self) -> Result<Vec<R>> {
        let value = self.fetch_cached(R::PATH.to_string()).await?;
        list_items(value)
            .into_iter()
            .map(|item| decode(R::PATH, item))
            .collect()
    }

    /// Fetch one item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the item does not decode.
    #[instrument(skip_all, fields(path = R::PATH, id = %id))]
    pub async fn get<R: Resource>(&self, id: &R::Id) -> Result<R> {
        let path = item_path::<R>(id);
        let value = self.fetch_cached(path.clone()).await?;
        decode(&path, value)
    }

    /// Create an item and return it as stored by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all, fields(path = R::PATH))]
    pub async fn create<R: Resource>(&self, item: &R) -> Result<R> {
        let created: R = self.api.post(R::PATH, item).await?;
        self.cache.invalidate(R::PATH).await;
        info!(path = R::PATH, "Content created");
        Ok(created)
    }

    /// Replace an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all, fields(path = R::PATH, id = %id))]
    pub async fn update<R: Resource>(&self, id: &R::Id, item: &R) -> Result<R> {
        let path = item_path::<R>(id);
        let updated: R = self.api.put(&path, item).await?;
        self.invalidate_item::<R>(&path).await;
        info!(path = %path, "Content updated");
        Ok(updated)
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip_all, fields(path = R::PATH, id = %id))]
    pub async fn delete<R: Resource>(&self, id: &R::Id) -> Result<()> {
        let path = item_path::<R>(id);
        let _: Value = self.api.delete(&path).await?;
        self.invalidate_item::<R>(&path).await;
        info!(path = %path, "Content deleted");
        Ok(())
    }

    /// List any collection as raw JSON items.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_raw(&self, kind: ContentKind) -> Result<Vec<Value>> {
        let value = self.fetch_cached(kind.path().to_string()).await?;
        Ok(list_items(value))
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    async fn fetch_cached(&self, path: String) -> Result<Value> {
        if let Some(value) = self.cache.get(&path).await {
            debug!(path = %path, "Cache hit");
            return Ok(value);
        }
        let value: Value = self.api.get(&path).await?;
        self.cache.insert(path, value.clone()).await;
        Ok(value)
    }

    async fn invalidate_item<R: Resource>(&self, path: &str) {
        self.cache.invalidate(path).await;
        self.cache.invalidate(R::PATH).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

fn item_path<R: Resource>(id: &R::Id) -> String {
    format!("{}/{}", R::PATH, id.as_ref())
}

fn decode<R: DeserializeOwned>(endpoint: &str, value: Value) -> Result<R> {
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Items of a listing, whether bare or nested one level under a named key.
fn list_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .into_iter()
            .find_map(|(_, v)| match v {
                Value::Array(items) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}
