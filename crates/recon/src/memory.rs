//! In-memory directory.
//!
//! Backs the snapshot destination and every engine test. Counts calls so
//! tests can assert that a dry run never mutates, and can inject failures
//! per operation and address.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};

use contact_migrate_core::{normalize, ContactAttributes, ContactRecord, Identity};

use crate::directory::{ContactHandles, DestinationDirectory, DirectoryError, SourceDirectory};
use crate::payload::AttributePayload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemoryHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Find,
    Fetch,
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub finds: usize,
    pub fetches: usize,
    pub creates: usize,
    pub updates: usize,
}

impl CallCounts {
    pub fn mutations(&self) -> usize {
        self.creates + self.updates
    }
}

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    contacts: BTreeMap<u64, ContactRecord>,
    next_id: u64,
    calls: CallCounts,
    source_reads: Cell<usize>,
    failures: HashMap<(Operation, String), DirectoryError>,
}

fn key(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ContactRecord>) -> Self {
        let mut dir = Self::new();
        for record in records {
            dir.insert(record);
        }
        dir
    }

    pub fn insert(&mut self, record: ContactRecord) -> MemoryHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.contacts.insert(id, record);
        MemoryHandle(id)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &ContactRecord> + '_ {
        self.contacts.values()
    }

    pub fn into_records(self) -> Vec<ContactRecord> {
        self.contacts.into_values().collect()
    }

    pub fn get(&self, address: &str) -> Option<&ContactRecord> {
        let wanted = key(address);
        self.contacts.values().find(|r| {
            r.external_address()
                .map(|a| key(a) == wanted)
                .unwrap_or(false)
        })
    }

    pub fn calls(&self) -> CallCounts {
        self.calls
    }

    /// Contact detail reads served through `SourceDirectory`.
    pub fn source_reads(&self) -> usize {
        self.source_reads.get()
    }

    /// Make every `op` touching `address` fail with `error`.
    pub fn fail_on(&mut self, op: Operation, address: &str, error: DirectoryError) {
        self.failures.insert((op, key(address)), error);
    }

    fn injected(&self, op: Operation, address: &str) -> Result<(), DirectoryError> {
        match self.failures.get(&(op, key(address))) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn address_of(&self, handle: &MemoryHandle) -> Result<String, DirectoryError> {
        self.contacts
            .get(&handle.0)
            .and_then(|r| r.external_address())
            .map(str::to_string)
            .ok_or(DirectoryError::NotFound)
    }
}

// ---------------------------------------------------------------------------
// Destination
// ---------------------------------------------------------------------------

impl DestinationDirectory for MemoryDirectory {
    type Handle = MemoryHandle;

    fn find_by_external_address(
        &mut self,
        address: &str,
    ) -> Result<Option<MemoryHandle>, DirectoryError> {
        self.calls.finds += 1;
        self.injected(Operation::Find, address)?;

        let wanted = key(address);
        Ok(self
            .contacts
            .iter()
            .find(|(_, r)| {
                r.external_address()
                    .map(|a| key(a) == wanted)
                    .unwrap_or(false)
            })
            .map(|(id, _)| MemoryHandle(*id)))
    }

    fn mutable_attributes(
        &mut self,
        handle: &MemoryHandle,
    ) -> Result<ContactAttributes, DirectoryError> {
        self.calls.fetches += 1;
        let address = self.address_of(handle)?;
        self.injected(Operation::Fetch, &address)?;
        Ok(self.contacts[&handle.0].attributes.clone())
    }

    fn create(
        &mut self,
        identity: &Identity,
        attributes: &AttributePayload,
    ) -> Result<MemoryHandle, DirectoryError> {
        self.calls.creates += 1;
        self.injected(Operation::Create, &identity.external_address)?;

        if normalize(Some(&identity.external_address)).is_none() {
            return Err(DirectoryError::Validation(
                "external address is required".into(),
            ));
        }
        if self.get(&identity.external_address).is_some() {
            return Err(DirectoryError::Validation(format!(
                "a contact with address {} already exists",
                identity.external_address
            )));
        }

        let mut record = ContactRecord {
            external_address: Some(identity.external_address.clone()),
            alias: identity.alias.clone(),
            display_name: identity.display_name.clone(),
            name: identity.name.clone(),
            ..ContactRecord::default()
        };
        attributes.apply_to(&mut record.attributes);
        Ok(self.insert(record))
    }

    fn update(
        &mut self,
        handle: &MemoryHandle,
        changes: &AttributePayload,
    ) -> Result<(), DirectoryError> {
        self.calls.updates += 1;
        let address = self.address_of(handle)?;
        self.injected(Operation::Update, &address)?;

        let record = self
            .contacts
            .get_mut(&handle.0)
            .ok_or(DirectoryError::NotFound)?;
        changes.apply_to(&mut record.attributes);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

impl SourceDirectory for MemoryDirectory {
    type Handle = MemoryHandle;

    fn list_all_contacts(&self) -> Result<ContactHandles<'_, MemoryHandle>, DirectoryError> {
        Ok(Box::new(self.contacts.keys().map(|id| Ok(MemoryHandle(*id)))))
    }

    fn contact_details(&self, handle: &MemoryHandle) -> Result<ContactRecord, DirectoryError> {
        self.source_reads.set(self.source_reads.get() + 1);
        let record = self
            .contacts
            .get(&handle.0)
            .ok_or(DirectoryError::NotFound)?;
        if let Some(address) = record.external_address() {
            self.injected(Operation::Fetch, address)?;
        }
        Ok(ContactRecord {
            provenance: None,
            ..record.clone()
        })
    }
}
