use crate::common::{Lsn, PageId, RecordId, Result, SlotId, INVALID_LSN};

use super::slotted_page::{SlottedPage, SlottedPageRef};

/// Table page header layout (after the slotted page header):
///
/// | Field        | Offset | Size |
/// |--------------|--------|------|
/// | next_page_id | 16     | 4    |
/// | prev_page_id | 20     | 4    |
/// | lsn          | 24     | 8    |
///
/// Table pages of one heap form a doubly-linked list; the slot area starts
/// after the extended header.
const TABLE_HEADER_OFFSET: usize = 16;
const NEXT_PAGE_ID_OFFSET: usize = TABLE_HEADER_OFFSET;
const PREV_PAGE_ID_OFFSET: usize = TABLE_HEADER_OFFSET + 4;
const LSN_OFFSET: usize = TABLE_HEADER_OFFSET + 8;

/// Total header size (slotted header + table-specific fields)
const TABLE_HEADER_SIZE: usize = LSN_OFFSET + 8;

/// End-of-list marker
const INVALID_PAGE: u32 = u32::MAX;

/// Mutable view of a table heap page.
pub struct TablePage<'a> {
    inner: SlottedPage<'a>,
}

impl<'a> TablePage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self {
            inner: SlottedPage::new(data),
        }
    }

    /// Initializes a fresh table page with no neighbors.
    pub fn init(&mut self, page_id: PageId) {
        self.inner.init(page_id);
        self.inner.set_free_space_start(TABLE_HEADER_SIZE as u16);
        self.set_next_page_id(None);
        self.set_prev_page_id(None);
        self.set_lsn(INVALID_LSN);
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id()
    }

    pub fn next_page_id(&self) -> Option<PageId> {
        read_page_link(self.inner.data, NEXT_PAGE_ID_OFFSET)
    }

    pub fn set_next_page_id(&mut self, page_id: Option<PageId>) {
        write_page_link(self.inner.data, NEXT_PAGE_ID_OFFSET, page_id);
    }

    pub fn prev_page_id(&self) -> Option<PageId> {
        read_page_link(self.inner.data, PREV_PAGE_ID_OFFSET)
    }

    pub fn set_prev_page_id(&mut self, page_id: Option<PageId>) {
        write_page_link(self.inner.data, PREV_PAGE_ID_OFFSET, page_id);
    }

    pub fn lsn(&self) -> Lsn {
        u64::from_le_bytes(
            self.inner.data[LSN_OFFSET..LSN_OFFSET + 8]
                .try_into()
                .unwrap(),
        )
    }

    pub fn set_lsn(&mut self, lsn: Lsn) {
        self.inner.data[LSN_OFFSET..LSN_OFFSET + 8].copy_from_slice(&lsn.to_le_bytes());
    }

    /// Inserts a tuple and returns its record ID.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> Result<RecordId> {
        let slot_id = self.inner.insert_tuple(tuple)?;
        Ok(RecordId::new(self.page_id(), slot_id))
    }

    /// Returns the tuple bytes at the slot.
    pub fn get_tuple(&self, slot_id: SlotId) -> Result<&[u8]> {
        self.inner.get_tuple(slot_id)
    }

    /// Marks the tuple as deleted. Returns false if it was already gone.
    pub fn mark_delete(&mut self, slot_id: SlotId) -> Result<bool> {
        self.inner.delete_tuple(slot_id)
    }

    /// Replaces the tuple in place if it fits; returns false otherwise.
    pub fn update_tuple(&mut self, slot_id: SlotId, tuple: &[u8]) -> Result<bool> {
        self.inner.update_tuple(slot_id, tuple)
    }

    pub fn can_insert(&self, tuple_size: usize) -> bool {
        self.inner.can_insert(tuple_size)
    }

    pub fn tuple_count(&self) -> usize {
        self.inner.tuple_count()
    }

    pub fn num_slots(&self) -> u16 {
        self.inner.num_slots()
    }

    pub fn free_space(&self) -> usize {
        self.inner.free_space()
    }
}

/// Read-only view of a table heap page.
pub struct TablePageRef<'a> {
    inner: SlottedPageRef<'a>,
}

impl<'a> TablePageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: SlottedPageRef::new(data),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.inner.page_id()
    }

    pub fn next_page_id(&self) -> Option<PageId> {
        read_page_link(self.inner.data, NEXT_PAGE_ID_OFFSET)
    }

    pub fn prev_page_id(&self) -> Option<PageId> {
        read_page_link(self.inner.data, PREV_PAGE_ID_OFFSET)
    }

    pub fn get_tuple(&self, slot_id: SlotId) -> Result<&'a [u8]> {
        self.inner.get_tuple(slot_id)
    }

    /// Whether the slot holds a live tuple.
    pub fn is_live(&self, slot_id: SlotId) -> bool {
        matches!(self.inner.get_slot(slot_id), Some(e) if !e.is_empty())
    }

    pub fn tuple_count(&self) -> usize {
        self.inner.tuple_count()
    }

    pub fn num_slots(&self) -> u16 {
        self.inner.num_slots()
    }
}

fn read_page_link(data: &[u8], offset: usize) -> Option<PageId> {
    let value = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap());
    if value == INVALID_PAGE {
        None
    } else {
        Some(PageId::new(value))
    }
}

fn write_page_link(data: &mut [u8], offset: usize, page_id: Option<PageId>) {
    let value = page_id.map(|p| p.as_u32()).unwrap_or(INVALID_PAGE);
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}
