use crate::common::{PageId, QuarryError, Result, SlotId, PAGE_SIZE};

/// Slotted page layout:
///
/// +------------------+
/// | Page Header      |  (HEADER_SIZE bytes, possibly extended by wrappers)
/// +------------------+
/// | Slot Array       |  (grows forward)
/// +------------------+
/// | Free Space       |
/// +------------------+
/// | Tuple Data       |  (grows backward from the end of the page)
/// +------------------+
///
/// Each slot entry is `offset: u16, length: u16`; a length of zero marks a
/// deleted or never-used slot. Wrapping page types reserve extra header
/// bytes by bumping `free_space_start` before the first insert; the slot
/// array base is always `free_space_start - num_slots * SLOT_SIZE`.
const HEADER_SIZE: usize = 16;

/// Size of each slot entry in bytes
const SLOT_SIZE: usize = 4;

const PAGE_ID_OFFSET: usize = 0;
const NUM_SLOTS_OFFSET: usize = 4;
const FREE_SPACE_START_OFFSET: usize = 6;
const FREE_SPACE_END_OFFSET: usize = 8;

/// A slot array entry
#[derive(Debug, Clone, Copy)]
pub struct SlotEntry {
    /// Offset from the start of the page to the tuple bytes
    pub offset: u16,
    /// Length of the tuple (0 = empty/deleted)
    pub length: u16,
}

impl SlotEntry {
    pub fn new(offset: u16, length: u16) -> Self {
        Self { offset, length }
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }
}

/// Mutable view of a page interpreted as a slotted page.
pub struct SlottedPage<'a> {
    pub(crate) data: &'a mut [u8],
}

impl<'a> SlottedPage<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    /// Initializes a fresh slotted page.
    pub fn init(&mut self, page_id: PageId) {
        self.data.fill(0);
        self.set_page_id(page_id);
        self.set_num_slots(0);
        self.set_free_space_start(HEADER_SIZE as u16);
        self.set_free_space_end(PAGE_SIZE as u16);
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(read_u32(self.data, PAGE_ID_OFFSET))
    }

    pub fn set_page_id(&mut self, page_id: PageId) {
        write_u32(self.data, PAGE_ID_OFFSET, page_id.as_u32());
    }

    pub fn num_slots(&self) -> u16 {
        read_u16(self.data, NUM_SLOTS_OFFSET)
    }

    fn set_num_slots(&mut self, num_slots: u16) {
        write_u16(self.data, NUM_SLOTS_OFFSET, num_slots);
    }

    pub fn free_space_start(&self) -> u16 {
        read_u16(self.data, FREE_SPACE_START_OFFSET)
    }

    pub(crate) fn set_free_space_start(&mut self, offset: u16) {
        write_u16(self.data, FREE_SPACE_START_OFFSET, offset);
    }

    pub fn free_space_end(&self) -> u16 {
        read_u16(self.data, FREE_SPACE_END_OFFSET)
    }

    fn set_free_space_end(&mut self, offset: u16) {
        write_u16(self.data, FREE_SPACE_END_OFFSET, offset);
    }

    pub fn free_space(&self) -> usize {
        (self.free_space_end() as usize).saturating_sub(self.free_space_start() as usize)
    }

    pub fn can_insert(&self, tuple_size: usize) -> bool {
        self.free_space() >= tuple_size + SLOT_SIZE
    }

    fn slot_array_base(&self) -> usize {
        (self.free_space_start() as usize)
            .saturating_sub(self.num_slots() as usize * SLOT_SIZE)
    }

    pub fn get_slot(&self, slot_id: SlotId) -> Option<SlotEntry> {
        slot_at(self.data, self.slot_array_base(), self.num_slots(), slot_id)
    }

    fn set_slot(&mut self, slot_id: SlotId, entry: SlotEntry) {
        let offset = self.slot_array_base() + slot_id.as_u16() as usize * SLOT_SIZE;
        write_u16(self.data, offset, entry.offset);
        write_u16(self.data, offset + 2, entry.length);
    }

    /// Inserts a tuple and returns its slot ID. Empty slots are reused
    /// before the slot array grows.
    pub fn insert_tuple(&mut self, tuple: &[u8]) -> Result<SlotId> {
        let tuple_size = tuple.len();
        let needs_new_slot = self.find_empty_slot().is_none();
        let required = tuple_size + if needs_new_slot { SLOT_SIZE } else { 0 };

        if self.free_space() < required {
            return Err(QuarryError::PageOverflow {
                tuple_size,
                available: self.free_space().saturating_sub(SLOT_SIZE),
            });
        }

        let slot_id = match self.find_empty_slot() {
            Some(slot_id) => slot_id,
            None => {
                let slot_id = SlotId::new(self.num_slots());
                self.set_num_slots(slot_id.as_u16() + 1);
                self.set_free_space_start(self.free_space_start() + SLOT_SIZE as u16);
                slot_id
            }
        };

        let tuple_offset = self.free_space_end() - tuple_size as u16;
        self.data[tuple_offset as usize..tuple_offset as usize + tuple_size]
            .copy_from_slice(tuple);
        self.set_free_space_end(tuple_offset);
        self.set_slot(slot_id, SlotEntry::new(tuple_offset, tuple_size as u16));

        Ok(slot_id)
    }

    fn find_empty_slot(&self) -> Option<SlotId> {
        (0..self.num_slots())
            .map(SlotId::new)
            .find(|&slot_id| matches!(self.get_slot(slot_id), Some(e) if e.is_empty()))
    }

    /// Returns the tuple bytes stored at the slot.
    pub fn get_tuple(&self, slot_id: SlotId) -> Result<&[u8]> {
        get_tuple_bytes(self.data, self.slot_array_base(), self.num_slots(), slot_id)
    }

    /// Marks the slot as deleted. The tuple bytes are left in place; the
    /// space is reclaimed when the page is compacted or the slot is reused
    /// with a smaller tuple. Returns false if the slot was already empty.
    pub fn delete_tuple(&mut self, slot_id: SlotId) -> Result<bool> {
        let entry = self
            .get_slot(slot_id)
            .ok_or(QuarryError::InvalidSlotId(slot_id.as_u16()))?;
        if entry.is_empty() {
            return Ok(false);
        }
        self.set_slot(slot_id, SlotEntry::new(entry.offset, 0));
        Ok(true)
    }

    /// Replaces the tuple at the slot. Succeeds only when the new payload
    /// fits in the slot's existing space; returns false otherwise.
    pub fn update_tuple(&mut self, slot_id: SlotId, tuple: &[u8]) -> Result<bool> {
        let entry = self
            .get_slot(slot_id)
            .ok_or(QuarryError::InvalidSlotId(slot_id.as_u16()))?;
        if entry.is_empty() {
            return Ok(false);
        }
        if tuple.len() > entry.length as usize {
            return Ok(false);
        }

        let offset = entry.offset as usize;
        self.data[offset..offset + tuple.len()].copy_from_slice(tuple);
        self.set_slot(slot_id, SlotEntry::new(entry.offset, tuple.len() as u16));
        Ok(true)
    }

    /// Number of live (non-deleted) tuples.
    pub fn tuple_count(&self) -> usize {
        (0..self.num_slots())
            .filter(|&i| matches!(self.get_slot(SlotId::new(i)), Some(e) if !e.is_empty()))
            .count()
    }
}

/// Read-only view of a slotted page.
pub struct SlottedPageRef<'a> {
    pub(crate) data: &'a [u8],
}

impl<'a> SlottedPageRef<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        assert_eq!(data.len(), PAGE_SIZE);
        Self { data }
    }

    pub fn page_id(&self) -> PageId {
        PageId::new(read_u32(self.data, PAGE_ID_OFFSET))
    }

    pub fn num_slots(&self) -> u16 {
        read_u16(self.data, NUM_SLOTS_OFFSET)
    }

    fn slot_array_base(&self) -> usize {
        (read_u16(self.data, FREE_SPACE_START_OFFSET) as usize)
            .saturating_sub(self.num_slots() as usize * SLOT_SIZE)
    }

    pub fn get_slot(&self, slot_id: SlotId) -> Option<SlotEntry> {
        slot_at(self.data, self.slot_array_base(), self.num_slots(), slot_id)
    }

    pub fn get_tuple(&self, slot_id: SlotId) -> Result<&'a [u8]> {
        get_tuple_bytes(self.data, self.slot_array_base(), self.num_slots(), slot_id)
    }

    pub fn tuple_count(&self) -> usize {
        (0..self.num_slots())
            .filter(|&i| matches!(self.get_slot(SlotId::new(i)), Some(e) if !e.is_empty()))
            .count()
    }
}

fn slot_at(data: &[u8], base: usize, num_slots: u16, slot_id: SlotId) -> Option<SlotEntry> {
    if slot_id.as_u16() >= num_slots {
        return None;
    }
    let offset = base + slot_id.as_u16() as usize * SLOT_SIZE;
    Some(SlotEntry::new(
        read_u16(data, offset),
        read_u16(data, offset + 2),
    ))
}

fn get_tuple_bytes(data: &[u8], base: usize, num_slots: u16, slot_id: SlotId) -> Result<&[u8]> {
    let entry = slot_at(data, base, num_slots, slot_id)
        .ok_or(QuarryError::InvalidSlotId(slot_id.as_u16()))?;
    if entry.is_empty() {
        return Err(QuarryError::InvalidSlotId(slot_id.as_u16()));
    }
    Ok(&data[entry.offset as usize..entry.offset as usize + entry.length as usize])
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes(data[offset..offset + 2].try_into().unwrap())
}

fn write_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn write_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slotted_page_insert_get() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SlottedPage::new(&mut data);
        page.init(PageId::new(7));

        let s0 = page.insert_tuple(b"first").unwrap();
        let s1 = page.insert_tuple(b"second").unwrap();

        assert_eq!(page.page_id(), PageId::new(7));
        assert_eq!(page.get_tuple(s0).unwrap(), b"first");
        assert_eq!(page.get_tuple(s1).unwrap(), b"second");
        assert_eq!(page.tuple_count(), 2);
    }

    #[test]
    fn test_slotted_page_delete_and_reuse() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SlottedPage::new(&mut data);
        page.init(PageId::new(1));

        let s0 = page.insert_tuple(b"abc").unwrap();
        let _s1 = page.insert_tuple(b"def").unwrap();

        assert!(page.delete_tuple(s0).unwrap());
        assert!(!page.delete_tuple(s0).unwrap());
        assert_eq!(page.tuple_count(), 1);
        assert!(page.get_tuple(s0).is_err());

        // the freed slot is reused
        let s2 = page.insert_tuple(b"xy").unwrap();
        assert_eq!(s2, s0);
        assert_eq!(page.tuple_count(), 2);
    }

    #[test]
    fn test_slotted_page_update_in_place() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SlottedPage::new(&mut data);
        page.init(PageId::new(1));

        let slot = page.insert_tuple(b"hello world").unwrap();

        assert!(page.update_tuple(slot, b"hello rust!").unwrap());
        assert_eq!(page.get_tuple(slot).unwrap(), b"hello rust!");

        // shrinking is fine
        assert!(page.update_tuple(slot, b"hi").unwrap());
        assert_eq!(page.get_tuple(slot).unwrap(), b"hi");

        // growing past the original slot space is refused
        assert!(!page.update_tuple(slot, b"much longer payload").unwrap());
    }

    #[test]
    fn test_slotted_page_overflow() {
        let mut data = [0u8; PAGE_SIZE];
        let mut page = SlottedPage::new(&mut data);
        page.init(PageId::new(1));

        let big = vec![0xAA; PAGE_SIZE];
        assert!(matches!(
            page.insert_tuple(&big),
            Err(QuarryError::PageOverflow { .. })
        ));
    }

    #[test]
    fn test_slotted_page_ref_matches_mut_view() {
        let mut data = [0u8; PAGE_SIZE];
        {
            let mut page = SlottedPage::new(&mut data);
            page.init(PageId::new(3));
            page.insert_tuple(b"payload").unwrap();
        }

        let page = SlottedPageRef::new(&data);
        assert_eq!(page.page_id(), PageId::new(3));
        assert_eq!(page.get_tuple(SlotId::new(0)).unwrap(), b"payload");
        assert_eq!(page.tuple_count(), 1);
    }
}
