//! REST directory adapters.
//!
//! | Operation                | Request                                               |
//! |--------------------------|-------------------------------------------------------|
//! | list contacts (paged)    | `GET /v1/contacts?limit=N&cursor=C`                   |
//! | contact details          | `GET /v1/contacts/{id}`                               |
//! | find by external address | `GET /v1/contacts?external_address=A`                 |
//! | create                   | `POST /v1/contacts` -> `{ "id" }`                     |
//! | update                   | `PATCH /v1/contacts/{id}` with the changed attributes |
//!
//! Pages are `{ "data": [{ "id": .. }], "next_cursor": ".." | null }`.
//!
//! Reads go through `Session::send` and are retried on 429/5xx. Writes go
//! through `Session::send_once` and are never resent.

use std::collections::{HashSet, VecDeque};

use contact_migrate_core::{ContactAttributes, ContactRecord, Identity};
use contact_migrate_recon::directory::ContactHandles;
use contact_migrate_recon::{
    AttributePayload, DestinationDirectory, DirectoryError, SourceDirectory,
};

use super::client::id_of;
use super::session::Session;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

pub struct HttpSource<'s> {
    session: &'s Session,
    page_size: u32,
}

impl<'s> HttpSource<'s> {
    pub fn new(session: &'s Session, page_size: u32) -> Self {
        Self { session, page_size }
    }
}

impl SourceDirectory for HttpSource<'_> {
    type Handle = String;

    fn list_all_contacts(&self) -> Result<ContactHandles<'_, String>, DirectoryError> {
        let mut pages = ContactPages::new(self.session, self.page_size);
        // First page up front: an unreachable listing fails here, not mid-export.
        pages.fetch_next()?;
        Ok(Box::new(pages))
    }

    fn contact_details(&self, id: &String) -> Result<ContactRecord, DirectoryError> {
        fetch_contact(self.session, id)
    }
}

/// Cursor-paged contact ids, fetched lazily.
struct ContactPages<'s> {
    session: &'s Session,
    page_size: u32,
    buffer: VecDeque<String>,
    cursor: Option<String>,
    seen_cursors: HashSet<String>,
    pages: usize,
    done: bool,
}

impl<'s> ContactPages<'s> {
    fn new(session: &'s Session, page_size: u32) -> Self {
        Self {
            session,
            page_size,
            buffer: VecDeque::new(),
            cursor: None,
            seen_cursors: HashSet::new(),
            pages: 0,
            done: false,
        }
    }

    fn fetch_next(&mut self) -> Result<(), DirectoryError> {
        let url = self.session.client().endpoint(&["v1", "contacts"]);
        let limit = self.page_size.to_string();
        let cursor = self.cursor.clone();

        let body = self.session.send(|http| {
            let mut params = vec![("limit", limit.clone())];
            if let Some(ref c) = cursor {
                params.push(("cursor", c.clone()));
            }
            http.get(url.clone()).query(&params)
        })?;

        let data = body["data"].as_array().ok_or_else(|| {
            DirectoryError::Connection(format!(
                "{} returned a contact page without data",
                self.session.label()
            ))
        })?;

        let mut ids = Vec::with_capacity(data.len());
        for item in data {
            let id = id_of(item).ok_or_else(|| {
                DirectoryError::Connection(format!(
                    "{} returned a contact without id",
                    self.session.label()
                ))
            })?;
            ids.push(id);
        }

        let next = body["next_cursor"]
            .as_str()
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        // Guard: more pages promised but nothing in this one
        if next.is_some() && ids.is_empty() {
            return Err(DirectoryError::Connection(format!(
                "{} returned next_cursor with empty data (malformed response)",
                self.session.label()
            )));
        }

        match next {
            None => self.done = true,
            Some(c) => {
                // Infinite loop protection: detect repeated cursor
                if !self.seen_cursors.insert(c.clone()) {
                    return Err(DirectoryError::Connection(format!(
                        "{} pagination stuck: cursor {c} repeated",
                        self.session.label()
                    )));
                }
                self.cursor = Some(c);
            }
        }

        self.pages += 1;
        tracing::debug!(page = self.pages, contacts = ids.len(), "fetched contact page");
        self.buffer.extend(ids);
        Ok(())
    }
}

impl Iterator for ContactPages<'_> {
    type Item = Result<String, DirectoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.buffer.pop_front() {
                return Some(Ok(id));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.fetch_next() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

fn fetch_contact(session: &Session, id: &str) -> Result<ContactRecord, DirectoryError> {
    let url = session.client().endpoint(&["v1", "contacts", id]);
    let body = session.send(|http| http.get(url.clone()))?;
    let mut record: ContactRecord = serde_json::from_value(body).map_err(|e| {
        DirectoryError::Connection(format!("{} contact {id} is malformed: {e}", session.label()))
    })?;
    record.provenance = None;
    Ok(record)
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

pub struct HttpDestination<'s> {
    session: &'s Session,
}

impl<'s> HttpDestination<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }
}

impl DestinationDirectory for HttpDestination<'_> {
    type Handle = String;

    fn find_by_external_address(&mut self, address: &str) -> Result<Option<String>, DirectoryError> {
        let url = self.session.client().endpoint(&["v1", "contacts"]);
        let body = match self
            .session
            .send(|http| http.get(url.clone()).query(&[("external_address", address)]))
        {
            Ok(body) => body,
            Err(DirectoryError::NotFound) => return Ok(None),
            Err(e) => return Err(e),
        };

        let data = body["data"].as_array().ok_or_else(|| {
            DirectoryError::Connection(format!(
                "{} returned a lookup without data",
                self.session.label()
            ))
        })?;
        let matches: Vec<String> = data.iter().filter_map(id_of).collect();

        if matches.len() > 1 {
            tracing::warn!(
                external_address = address,
                matches = matches.len(),
                "several contacts share this address; using the first"
            );
        }
        Ok(matches.into_iter().next())
    }

    fn mutable_attributes(&mut self, id: &String) -> Result<ContactAttributes, DirectoryError> {
        fetch_contact(self.session, id).map(|record| record.attributes)
    }

    fn create(
        &mut self,
        identity: &Identity,
        attributes: &AttributePayload,
    ) -> Result<String, DirectoryError> {
        let body = creation_body(identity, attributes)?;
        let url = self.session.client().endpoint(&["v1", "contacts"]);
        let resp = self.session.send_once(|http| http.post(url.clone()).json(&body))?;
        id_of(&resp).ok_or_else(|| {
            DirectoryError::Connection(format!(
                "{} create response has no id",
                self.session.label()
            ))
        })
    }

    fn update(&mut self, id: &String, changes: &AttributePayload) -> Result<(), DirectoryError> {
        if changes.is_empty() {
            return Ok(());
        }
        let url = self.session.client().endpoint(&["v1", "contacts", id]);
        self.session
            .send_once(|http| http.patch(url.clone()).json(changes))?;
        Ok(())
    }
}

/// Identity fields plus the attributes accepted at creation, as one object.
fn creation_body(
    identity: &Identity,
    attributes: &AttributePayload,
) -> Result<serde_json::Map<String, serde_json::Value>, DirectoryError> {
    let to_object = |value: Result<serde_json::Value, serde_json::Error>| match value {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(DirectoryError::Validation("payload is not an object".into())),
        Err(e) => Err(DirectoryError::Validation(e.to_string())),
    };
    let mut body = to_object(serde_json::to_value(identity))?;
    body.extend(to_object(serde_json::to_value(attributes))?);
    Ok(body)
}
