use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, QuarryError, RecordId, Result, SlotId, PAGE_SIZE};
use crate::tuple::{Schema, Tuple};

use super::page::{TablePage, TablePageRef};

/// Largest tuple that fits in a fresh table page (page size minus the table
/// page header and one slot entry).
const MAX_TUPLE_SIZE: usize = PAGE_SIZE - 40;

/// A table stored as a doubly-linked chain of table pages. The heap does not
/// cache anything: every operation pins the pages it touches through the
/// buffer pool and unpins them before returning.
pub struct TableHeap {
    bpm: Arc<dyn BufferPool>,
    first_page_id: PageId,
    schema: Arc<Schema>,
}

impl TableHeap {
    /// Creates an empty heap with a single page.
    pub fn new(bpm: Arc<dyn BufferPool>, schema: Arc<Schema>) -> Result<Self> {
        let (first_page_id, frame) = bpm.new_page()?;
        {
            let mut data = frame.write_data();
            let mut page = TablePage::new(&mut data[..]);
            page.init(first_page_id);
        }
        bpm.unpin_page(first_page_id, true);

        Ok(Self {
            bpm,
            first_page_id,
            schema,
        })
    }

    /// Reopens a heap whose first page already exists.
    pub fn open(bpm: Arc<dyn BufferPool>, first_page_id: PageId, schema: Arc<Schema>) -> Self {
        Self {
            bpm,
            first_page_id,
            schema,
        }
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Inserts a tuple, appending a page to the chain when no existing page
    /// has room. Returns the new tuple's record id.
    pub fn insert_tuple(&self, tuple: &Tuple) -> Result<RecordId> {
        let bytes = tuple.to_bytes().ok_or(QuarryError::TupleEncoding)?;
        if bytes.len() > MAX_TUPLE_SIZE {
            return Err(QuarryError::PageOverflow {
                tuple_size: bytes.len(),
                available: MAX_TUPLE_SIZE,
            });
        }

        let mut page_id = self.first_page_id;
        loop {
            let frame = self.bpm.fetch_page(page_id)?;
            let mut data = frame.write_data();
            let mut page = TablePage::new(&mut data[..]);

            if page.can_insert(bytes.len()) {
                let rid = page.insert_tuple(&bytes)?;
                drop(data);
                self.bpm.unpin_page(page_id, true);
                return Ok(rid);
            }

            match page.next_page_id() {
                Some(next) => {
                    drop(data);
                    self.bpm.unpin_page(page_id, false);
                    page_id = next;
                }
                None => {
                    let (new_page_id, new_frame) = self.bpm.new_page()?;
                    {
                        let mut new_data = new_frame.write_data();
                        let mut new_page = TablePage::new(&mut new_data[..]);
                        new_page.init(new_page_id);
                        new_page.set_prev_page_id(Some(page_id));
                    }
                    page.set_next_page_id(Some(new_page_id));
                    drop(data);
                    self.bpm.unpin_page(page_id, true);
                    self.bpm.unpin_page(new_page_id, true);
                    page_id = new_page_id;
                }
            }
        }
    }

    /// Reads the tuple at the record id, or None if the slot is empty.
    pub fn get_tuple(&self, rid: RecordId) -> Result<Option<Tuple>> {
        let frame = self.bpm.fetch_page(rid.page_id)?;
        let result = {
            let data = frame.read_data();
            let page = TablePageRef::new(&data[..]);
            if page.is_live(rid.slot_id) {
                let bytes = page.get_tuple(rid.slot_id)?;
                Some(
                    Tuple::from_bytes(Arc::clone(&self.schema), bytes)
                        .ok_or(QuarryError::TupleEncoding)?,
                )
            } else {
                None
            }
        };
        self.bpm.unpin_page(rid.page_id, false);
        Ok(result)
    }

    /// Marks the tuple deleted. Returns false if it was already gone.
    pub fn mark_delete(&self, rid: RecordId) -> Result<bool> {
        let frame = self.bpm.fetch_page(rid.page_id)?;
        let deleted = {
            let mut data = frame.write_data();
            let mut page = TablePage::new(&mut data[..]);
            page.mark_delete(rid.slot_id).unwrap_or(false)
        };
        self.bpm.unpin_page(rid.page_id, deleted);
        Ok(deleted)
    }

    /// Rewrites the tuple in place. Returns false when the new encoding does
    /// not fit the slot or the slot is empty.
    pub fn update_tuple(&self, tuple: &Tuple, rid: RecordId) -> Result<bool> {
        let bytes = tuple.to_bytes().ok_or(QuarryError::TupleEncoding)?;

        let frame = self.bpm.fetch_page(rid.page_id)?;
        let updated = {
            let mut data = frame.write_data();
            let mut page = TablePage::new(&mut data[..]);
            page.update_tuple(rid.slot_id, &bytes).unwrap_or(false)
        };
        self.bpm.unpin_page(rid.page_id, updated);
        Ok(updated)
    }

    /// Forward iterator over every live tuple in the heap.
    pub fn iter(&self) -> TableIterator {
        TableIterator {
            bpm: Arc::clone(&self.bpm),
            schema: Arc::clone(&self.schema),
            current_page: Some(self.first_page_id),
            next_slot: 0,
        }
    }
}

/// Walks the page chain front to back, skipping deleted slots.
pub struct TableIterator {
    bpm: Arc<dyn BufferPool>,
    schema: Arc<Schema>,
    current_page: Option<PageId>,
    next_slot: u16,
}

impl TableIterator {
    pub fn next(&mut self) -> Result<Option<(RecordId, Tuple)>> {
        loop {
            let page_id = match self.current_page {
                Some(page_id) => page_id,
                None => return Ok(None),
            };

            let frame = self.bpm.fetch_page(page_id)?;
            let (found, next_page) = {
                let data = frame.read_data();
                let page = TablePageRef::new(&data[..]);

                let mut found = None;
                while self.next_slot < page.num_slots() {
                    let slot_id = SlotId::new(self.next_slot);
                    self.next_slot += 1;
                    if page.is_live(slot_id) {
                        let bytes = page.get_tuple(slot_id)?;
                        let tuple = Tuple::from_bytes(Arc::clone(&self.schema), bytes)
                            .ok_or(QuarryError::TupleEncoding)?;
                        found = Some((RecordId::new(page_id, slot_id), tuple));
                        break;
                    }
                }
                (found, page.next_page_id())
            };
            self.bpm.unpin_page(page_id, false);

            if found.is_some() {
                return Ok(found);
            }
            self.current_page = next_page;
            self.next_slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferPoolInstance;
    use crate::storage::disk::DiskManager;
    use crate::tuple::{DataType, Value};
    use tempfile::NamedTempFile;

    fn create_heap() -> (TableHeap, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm: Arc<dyn BufferPool> = Arc::new(BufferPoolInstance::new(20, dm));
        let schema = Schema::shared(vec![
            ("id", DataType::Integer),
            ("name", DataType::VarChar(64)),
        ]);
        (TableHeap::new(bpm, schema).unwrap(), temp_file)
    }

    fn row(heap: &TableHeap, id: i32, name: &str) -> Tuple {
        Tuple::new(
            Arc::clone(heap.schema()),
            vec![Value::Integer(id), Value::Varchar(name.into())],
        )
    }

    #[test]
    fn test_heap_insert_and_get() {
        let (heap, _temp) = create_heap();

        let tuple = row(&heap, 1, "alice");
        let rid = heap.insert_tuple(&tuple).unwrap();

        assert_eq!(heap.get_tuple(rid).unwrap(), Some(tuple));
    }

    #[test]
    fn test_heap_mark_delete() {
        let (heap, _temp) = create_heap();

        let rid = heap.insert_tuple(&row(&heap, 1, "alice")).unwrap();
        assert!(heap.mark_delete(rid).unwrap());
        assert!(!heap.mark_delete(rid).unwrap());
        assert_eq!(heap.get_tuple(rid).unwrap(), None);
    }

    #[test]
    fn test_heap_update() {
        let (heap, _temp) = create_heap();

        let rid = heap.insert_tuple(&row(&heap, 1, "alice")).unwrap();
        assert!(heap.update_tuple(&row(&heap, 2, "al"), rid).unwrap());
        assert_eq!(
            heap.get_tuple(rid).unwrap().unwrap().value(0),
            Some(&Value::Integer(2))
        );
    }

    #[test]
    fn test_heap_iterator_spans_pages() {
        let (heap, _temp) = create_heap();

        let long_name = "x".repeat(60);
        let count = 300; // enough rows to overflow one page
        for i in 0..count {
            heap.insert_tuple(&row(&heap, i, &long_name)).unwrap();
        }

        let mut iter = heap.iter();
        let mut seen = Vec::new();
        while let Some((_rid, tuple)) = iter.next().unwrap() {
            match tuple.value(0) {
                Some(Value::Integer(v)) => seen.push(*v),
                other => panic!("unexpected value {:?}", other),
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn test_heap_iterator_skips_deleted() {
        let (heap, _temp) = create_heap();

        let r1 = heap.insert_tuple(&row(&heap, 1, "a")).unwrap();
        let _r2 = heap.insert_tuple(&row(&heap, 2, "b")).unwrap();
        let r3 = heap.insert_tuple(&row(&heap, 3, "c")).unwrap();

        heap.mark_delete(r1).unwrap();
        heap.mark_delete(r3).unwrap();

        let mut iter = heap.iter();
        let (_, tuple) = iter.next().unwrap().unwrap();
        assert_eq!(tuple.value(0), Some(&Value::Integer(2)));
        assert!(iter.next().unwrap().is_none());
    }

    #[test]
    fn test_heap_rejects_oversized_tuple() {
        let temp_file = NamedTempFile::new().unwrap();
        let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
        let bpm: Arc<dyn BufferPool> = Arc::new(BufferPoolInstance::new(20, dm));
        let schema = Schema::shared(vec![("blob", DataType::VarChar(u16::MAX))]);
        let heap = TableHeap::new(bpm, Arc::clone(&schema)).unwrap();

        let tuple = Tuple::new(schema, vec![Value::Varchar("y".repeat(PAGE_SIZE))]);
        assert!(matches!(
            heap.insert_tuple(&tuple),
            Err(QuarryError::PageOverflow { .. })
        ));
    }
}
