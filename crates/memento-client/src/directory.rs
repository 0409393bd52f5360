use uuid::Uuid;

use memento_core::directory::{SortConfig, SortKey, project};
use memento_core::format::{avatar_color, format_handle, initials, normalize_url, or_placeholder};
use memento_types::events::GatewayEvent;
use memento_types::models::{DirectoryRecord, Standing};

use crate::backend::PortalBackend;
use crate::error::ClientError;

/// One table row, ready to render. Missing text fields show the
/// placeholder; missing links are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryRow {
    pub id: Uuid,
    pub name: String,
    pub initials: String,
    pub avatar_color: &'static str,
    pub student_id: String,
    pub batch: String,
    pub standing: Standing,
    pub hometown: String,
    pub current_city: String,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
}

impl DirectoryRow {
    fn render(record: &DirectoryRecord) -> Self {
        let name = record.identity.full_name.as_deref().unwrap_or_default();
        let link = |raw: &Option<String>| raw.as_deref().and_then(normalize_url);
        let handle = |raw: &Option<String>| raw.as_deref().and_then(format_handle);

        Self {
            id: record.id,
            name: or_placeholder(record.identity.full_name.as_deref()).to_string(),
            initials: initials(name),
            avatar_color: avatar_color(name),
            student_id: or_placeholder(record.identity.student_id.as_deref()).to_string(),
            batch: or_placeholder(record.identity.batch.as_deref()).to_string(),
            standing: record.identity.standing,
            hometown: or_placeholder(record.location.hometown.as_deref()).to_string(),
            current_city: or_placeholder(record.location.current_city.as_deref()).to_string(),
            email: or_placeholder(record.contact.email.as_deref()).to_string(),
            phone: or_placeholder(record.contact.phone.as_deref()).to_string(),
            website: link(&record.contact.website),
            github: handle(&record.contact.github),
            linkedin: link(&record.contact.linkedin),
            instagram: handle(&record.contact.instagram),
            facebook: link(&record.contact.facebook),
        }
    }
}

/// The student/alumni table. Records stay in fetch order; `rows` projects
/// them through the current sort on every call.
pub struct DirectoryView<B> {
    backend: B,
    records: Vec<DirectoryRecord>,
    sort: SortConfig,
}

impl<B: PortalBackend> DirectoryView<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            records: Vec::new(),
            sort: SortConfig::default(),
        }
    }

    pub async fn load(&mut self) -> Result<(), ClientError> {
        self.records = self.backend.fetch_directory().await?;
        Ok(())
    }

    pub fn sort(&self) -> SortConfig {
        self.sort
    }

    /// Column header click.
    pub fn request_sort(&mut self, key: SortKey) {
        self.sort = self.sort.request_sort(key);
    }

    pub fn records(&self) -> &[DirectoryRecord] {
        &self.records
    }

    /// A pushed profile replaces the held record, or joins the end of the
    /// fetch order if it is new. The sort is reapplied by `rows`.
    pub fn apply_event(&mut self, event: &GatewayEvent) {
        if let GatewayEvent::ProfileUpdate { record } = event {
            match self.records.iter_mut().find(|r| r.id == record.id) {
                Some(held) => *held = record.clone(),
                None => self.records.push(record.clone()),
            }
        }
    }

    pub fn rows(&self) -> Vec<DirectoryRow> {
        project(&self.records, self.sort).iter().map(DirectoryRow::render).collect()
    }
}
