use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;

use crate::buffer::BufferPoolManager;
use crate::common::{PageId, QuarryError, RecordId, Result, SlotId, INVALID_PAGE_ID};
use crate::execution::executor::{Executor, ExecutorContext};
use crate::execution::expression::Expression;
use crate::execution::plan::OrderByDirection;
use crate::storage::page::{SortPage, SortPageRef};
use crate::tuple::{Schema, Tuple, Value};

/// Order-by specification shared by the sort phases.
type OrderBy = Vec<(OrderByDirection, Arc<Expression>)>;

/// Compares two sort keys column by column, honoring each column's
/// direction. Nulls order before every non-null value.
fn compare_sort_keys(a: &[Value], b: &[Value], order_by: &OrderBy) -> Ordering {
    for (i, (direction, _)) in order_by.iter().enumerate() {
        let ordering = match (a[i].is_null(), b[i].is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a[i].compare(&b[i]).unwrap_or(Ordering::Equal),
        };
        let ordering = match direction {
            OrderByDirection::Ascending => ordering,
            OrderByDirection::Descending => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn sort_key_of(tuple: &Tuple, schema: &Schema, order_by: &OrderBy) -> Vec<Value> {
    order_by
        .iter()
        .map(|(_, expr)| expr.evaluate(tuple, schema))
        .collect()
}

/// An ordered sequence of sort pages: tuples are sorted within each page
/// and across the pages of the run.
struct MergeSortRun {
    pages: Vec<PageId>,
    bpm: Arc<BufferPoolManager>,
}

impl MergeSortRun {
    fn iter(&self) -> Result<RunIterator> {
        let mut iterator = RunIterator {
            bpm: Arc::clone(&self.bpm),
            pages: self.pages.clone(),
            page_index: 0,
            tuple_index: 0,
        };
        iterator.position_at_tuple()?;
        Ok(iterator)
    }

    /// Hands every page of the run back to the buffer pool.
    fn destroy(self) -> Result<()> {
        for page_id in self.pages {
            self.bpm.delete_page(page_id)?;
        }
        Ok(())
    }
}

/// Walks a run's tuples in order. Pages are re-latched per read so no
/// guard is held across `next` calls; tuple bytes are copied out before
/// the guard drops.
struct RunIterator {
    bpm: Arc<BufferPoolManager>,
    pages: Vec<PageId>,
    page_index: usize,
    tuple_index: usize,
}

impl RunIterator {
    /// Skips forward until `(page_index, tuple_index)` names a tuple, or
    /// the run ends.
    fn position_at_tuple(&mut self) -> Result<()> {
        while self.page_index < self.pages.len() {
            let guard = self
                .bpm
                .checked_read_page(self.pages[self.page_index])?
                .ok_or(QuarryError::BufferPoolFull)?;
            if self.tuple_index < SortPageRef::new(guard.data()).tuple_count() {
                return Ok(());
            }
            self.page_index += 1;
            self.tuple_index = 0;
        }
        Ok(())
    }

    fn is_exhausted(&self) -> bool {
        self.page_index >= self.pages.len()
    }

    /// The current tuple's bytes without advancing.
    fn peek(&self) -> Result<Vec<u8>> {
        debug_assert!(!self.is_exhausted());
        let guard = self
            .bpm
            .checked_read_page(self.pages[self.page_index])?
            .ok_or(QuarryError::BufferPoolFull)?;
        Ok(SortPageRef::new(guard.data())
            .tuple_bytes(self.tuple_index)
            .to_vec())
    }

    fn advance(&mut self) -> Result<()> {
        self.tuple_index += 1;
        self.position_at_tuple()
    }
}

/// Collects sorted output pages for a run under construction.
struct RunBuilder {
    bpm: Arc<BufferPoolManager>,
    tuple_size: usize,
    pages: Vec<PageId>,
    current_page: Option<PageId>,
}

impl RunBuilder {
    fn new(bpm: Arc<BufferPoolManager>, tuple_size: usize) -> Self {
        Self {
            bpm,
            tuple_size,
            pages: Vec::new(),
            current_page: None,
        }
    }

    fn append(&mut self, tuple: &[u8]) -> Result<()> {
        if self.current_page.is_none() {
            let page_id = self.bpm.new_page();
            if !page_id.is_valid() {
                return Err(QuarryError::BufferPoolFull);
            }
            let mut guard = self
                .bpm
                .checked_write_page(page_id)?
                .ok_or(QuarryError::BufferPoolFull)?;
            SortPage::new(guard.data_mut()).init(self.tuple_size);
            self.current_page = Some(page_id);
        }

        let page_id = self.current_page.unwrap();
        let mut guard = self
            .bpm
            .checked_write_page(page_id)?
            .ok_or(QuarryError::BufferPoolFull)?;
        let mut page = SortPage::new(guard.data_mut());
        page.insert_tuple(tuple);
        if page.is_full() {
            self.pages.push(page_id);
            self.current_page = None;
        }
        Ok(())
    }

    fn finish(mut self) -> MergeSortRun {
        if let Some(page_id) = self.current_page.take() {
            self.pages.push(page_id);
        }
        MergeSortRun {
            pages: self.pages,
            bpm: self.bpm,
        }
    }
}

/// Two-phase, 2-way external merge sort over fixed-width tuples.
///
/// Phase 1 drains the child into sort pages, sorting each page in place;
/// every filled page becomes a one-page run. Phase 2 repeatedly merges
/// runs pairwise into longer runs, deleting consumed pages after each
/// pass, until one sorted run remains; `next` then walks that run.
pub struct ExternalMergeSortExecutor {
    ctx: Arc<ExecutorContext>,
    output_schema: Schema,
    order_by: OrderBy,
    child: Box<dyn Executor>,
    result: Option<(MergeSortRun, RunIterator)>,
}

impl ExternalMergeSortExecutor {
    pub fn new(
        ctx: Arc<ExecutorContext>,
        output_schema: Schema,
        order_by: OrderBy,
        child: Box<dyn Executor>,
    ) -> Self {
        Self {
            ctx,
            output_schema,
            order_by,
            child,
            result: None,
        }
    }

    /// Drains the child into single-page sorted runs.
    fn create_initial_runs(&mut self) -> Result<Vec<MergeSortRun>> {
        let tuple_size = self.output_schema.tuple_size();
        let bpm = Arc::clone(&self.ctx.bpm);
        let mut runs = Vec::new();

        let mut pending: Vec<(Vec<Value>, Vec<u8>)> = Vec::new();
        let page_capacity = {
            // Capacity of one sort page for this tuple width.
            let mut scratch = vec![0u8; crate::common::PAGE_SIZE];
            let mut page = SortPage::new(&mut scratch);
            page.init(tuple_size);
            page.max_tuple_count()
        };

        let mut flush_page = |pending: &mut Vec<(Vec<Value>, Vec<u8>)>| -> Result<()> {
            if pending.is_empty() {
                return Ok(());
            }
            pending.sort_by(|a, b| compare_sort_keys(&a.0, &b.0, &self.order_by));
            let mut builder = RunBuilder::new(Arc::clone(&bpm), tuple_size);
            for (_, bytes) in pending.drain(..) {
                builder.append(&bytes)?;
            }
            runs.push(builder.finish());
            Ok(())
        };

        while let Some((tuple, _)) = self.child.next()? {
            let key = sort_key_of(&tuple, &self.output_schema, &self.order_by);
            pending.push((key, tuple.to_bytes(&self.output_schema)?));
            if pending.len() == page_capacity {
                flush_page(&mut pending)?;
            }
        }
        flush_page(&mut pending)?;

        Ok(runs)
    }

    /// Merges two sorted runs into one.
    fn merge_pair(&self, left: &MergeSortRun, right: &MergeSortRun) -> Result<MergeSortRun> {
        let mut builder = RunBuilder::new(Arc::clone(&self.ctx.bpm), self.output_schema.tuple_size());
        let mut left_iter = left.iter()?;
        let mut right_iter = right.iter()?;

        let key_of = |bytes: &[u8]| {
            let tuple = Tuple::from_bytes(&self.output_schema, bytes);
            sort_key_of(&tuple, &self.output_schema, &self.order_by)
        };

        while !left_iter.is_exhausted() && !right_iter.is_exhausted() {
            let left_bytes = left_iter.peek()?;
            let right_bytes = right_iter.peek()?;
            if compare_sort_keys(&key_of(&left_bytes), &key_of(&right_bytes), &self.order_by)
                != Ordering::Greater
            {
                builder.append(&left_bytes)?;
                left_iter.advance()?;
            } else {
                builder.append(&right_bytes)?;
                right_iter.advance()?;
            }
        }
        while !left_iter.is_exhausted() {
            builder.append(&left_iter.peek()?)?;
            left_iter.advance()?;
        }
        while !right_iter.is_exhausted() {
            builder.append(&right_iter.peek()?)?;
            right_iter.advance()?;
        }

        Ok(builder.finish())
    }
}

impl Executor for ExternalMergeSortExecutor {
    fn init(&mut self) -> Result<()> {
        self.child.init()?;
        self.result = None;

        let mut runs = self.create_initial_runs()?;
        debug!("external sort: {} initial runs", runs.len());

        // Merge passes: pair up runs until one remains; consumed input
        // pages go back to the buffer pool after each pass.
        while runs.len() > 1 {
            let mut merged = Vec::with_capacity(runs.len().div_ceil(2));
            let mut inputs = runs.into_iter();
            while let Some(first) = inputs.next() {
                match inputs.next() {
                    Some(second) => {
                        merged.push(self.merge_pair(&first, &second)?);
                        first.destroy()?;
                        second.destroy()?;
                    }
                    None => merged.push(first),
                }
            }
            runs = merged;
        }

        if let Some(run) = runs.pop() {
            let iterator = run.iter()?;
            self.result = Some((run, iterator));
        }
        Ok(())
    }

    fn next(&mut self) -> Result<Option<(Tuple, RecordId)>> {
        let Some((_, iterator)) = self.result.as_mut() else {
            return Ok(None);
        };
        if iterator.is_exhausted() {
            return Ok(None);
        }
        let bytes = iterator.peek()?;
        iterator.advance()?;
        let tuple = Tuple::from_bytes(&self.output_schema, &bytes);
        Ok(Some((
            tuple,
            RecordId::new(INVALID_PAGE_ID, SlotId::new(0)),
        )))
    }

    fn output_schema(&self) -> &Schema {
        &self.output_schema
    }
}
