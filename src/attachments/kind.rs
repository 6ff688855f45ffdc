use serde::{Deserialize, Serialize};
use std::fmt;

/// Business tables whose rows carry an attachment.
///
/// The declaration order is the round-robin order used by placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentTable {
    Bills,
    Policies,
    PropertyDocuments,
    InventoryItems,
    VehicleMaintenance,
    PetMedical,
}

impl AttachmentTable {
    pub const ALL: [AttachmentTable; 6] = [
        AttachmentTable::Bills,
        AttachmentTable::Policies,
        AttachmentTable::PropertyDocuments,
        AttachmentTable::InventoryItems,
        AttachmentTable::VehicleMaintenance,
        AttachmentTable::PetMedical,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            AttachmentTable::Bills => "bills",
            AttachmentTable::Policies => "policies",
            AttachmentTable::PropertyDocuments => "property_documents",
            AttachmentTable::InventoryItems => "inventory_items",
            AttachmentTable::VehicleMaintenance => "vehicle_maintenance",
            AttachmentTable::PetMedical => "pet_medical",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn iter() -> impl Iterator<Item = AttachmentTable> {
        Self::ALL.into_iter()
    }
}

impl fmt::Display for AttachmentTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two storage roots an attachment can live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RootKey {
    #[serde(rename = "attachments")]
    Attachments,
    #[serde(rename = "appData")]
    AppData,
}

impl RootKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            RootKey::Attachments => "attachments",
            RootKey::AppData => "appData",
        }
    }
}

impl fmt::Display for RootKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Files up to this many bytes count as small.
pub const SMALL_MAX_BYTES: u64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Small,
    Medium,
}

impl SourceKind {
    pub fn classify(size: u64) -> Self {
        if size <= SMALL_MAX_BYTES {
            SourceKind::Small
        } else {
            SourceKind::Medium
        }
    }
}
