use std::cmp::Ordering;
use std::sync::Arc;

use log::debug;

use crate::buffer::{BufferPoolManager, ReadPageGuard, WritePageGuard};
use crate::common::{PageId, QuarryError, RecordId, Result, INVALID_PAGE_ID};

use super::btree_page::{
    page_type_of, HeaderPage, HeaderPageRef, InternalPage, InternalPageRef, LeafPage, LeafPageRef,
    PAGE_TYPE_LEAF,
};
use super::{BPlusTreeIterator, KeyComparator};

/// State carried through one crabbing descent: the header guard (only
/// while a root change is still possible) and the retained root-to-node
/// path of write guards. Ancestors are released as soon as the newly
/// latched child is safe for the running operation.
struct Context {
    header_page: Option<WritePageGuard>,
    write_set: Vec<WritePageGuard>,
}

impl Context {
    fn release_ancestors(&mut self) {
        let keep_from = self.write_set.len() - 1;
        self.write_set.drain(..keep_from);
        self.header_page = None;
    }
}

/// What `fix_underflow` did at one level.
enum FixAction {
    /// The sibling was folded into the current node; delete the sibling.
    MergedSibling,
    /// The current node was folded into its left sibling; delete it.
    MergedCurrent,
    /// One entry moved over from the sibling; the tree is valid again.
    Redistributed,
}

/// A concurrent unique-key B+Tree over `(i64, RecordId)` pairs.
///
/// The root page id lives in a dedicated header page so that the tree
/// object itself is immutable state: buffer pool handle, comparator, and
/// the two fanout limits. All traversal follows latch crabbing: an
/// ancestor's latch is released once the child is known to be safe
/// (insert: below max; delete: above min), so concurrent operations on
/// disjoint subtrees proceed in parallel.
pub struct BPlusTree {
    header_page_id: PageId,
    bpm: Arc<BufferPoolManager>,
    comparator: Arc<dyn KeyComparator>,
    leaf_max_size: usize,
    internal_max_size: usize,
}

impl BPlusTree {
    /// Creates an empty tree, allocating its header page.
    pub fn new(
        bpm: Arc<BufferPoolManager>,
        comparator: Arc<dyn KeyComparator>,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self> {
        let header_page_id = Self::allocate_page(&bpm)?;
        {
            let mut guard = bpm
                .checked_write_page(header_page_id)?
                .ok_or(QuarryError::BufferPoolFull)?;
            HeaderPage::new(guard.data_mut()).init();
        }

        Ok(Self::open(
            header_page_id,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        ))
    }

    /// Attaches to an existing tree by its header page.
    pub fn open(
        header_page_id: PageId,
        bpm: Arc<BufferPoolManager>,
        comparator: Arc<dyn KeyComparator>,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Self {
        assert!(leaf_max_size >= 2 && internal_max_size >= 3);
        Self {
            header_page_id,
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        }
    }

    pub fn header_page_id(&self) -> PageId {
        self.header_page_id
    }

    pub fn root_page_id(&self) -> Result<PageId> {
        let guard = self.read_guard(self.header_page_id)?;
        Ok(HeaderPageRef::new(guard.data()).root_page_id())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(!self.root_page_id()?.is_valid())
    }

    /// Point lookup.
    pub fn get_value(&self, key: i64) -> Result<Option<RecordId>> {
        let header_guard = self.read_guard(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if !root_id.is_valid() {
            return Ok(None);
        }

        let mut guard = self.read_guard(root_id)?;
        drop(header_guard);

        loop {
            if page_type_of(guard.data()) == PAGE_TYPE_LEAF {
                let leaf = LeafPageRef::new(guard.data());
                return Ok(leaf.lookup(key, &*self.comparator));
            }
            let child_id = InternalPageRef::new(guard.data()).lookup(key, &*self.comparator);
            let child_guard = self.read_guard(child_id)?;
            guard = child_guard;
        }
    }

    /// Inserts a unique key. Returns false (leaving the tree unchanged)
    /// when the key is already present.
    pub fn insert(&self, key: i64, value: RecordId) -> Result<bool> {
        let mut ctx = Context {
            header_page: Some(self.write_guard(self.header_page_id)?),
            write_set: Vec::new(),
        };
        let root_id =
            HeaderPageRef::new(ctx.header_page.as_ref().unwrap().data()).root_page_id();

        if !root_id.is_valid() {
            let leaf_id = Self::allocate_page(&self.bpm)?;
            let mut leaf_guard = self.write_guard(leaf_id)?;
            LeafPage::init(leaf_guard.data_mut(), self.leaf_max_size).insert(
                key,
                value,
                &*self.comparator,
            );
            let header = ctx.header_page.as_mut().unwrap();
            HeaderPage::new(header.data_mut()).set_root_page_id(leaf_id);
            debug!("started new tree at root {leaf_id}");
            return Ok(true);
        }

        // Crabbing descent with write latches.
        let root_guard = self.write_guard(root_id)?;
        let root_safe = Self::safe_for_insert(root_guard.data());
        ctx.write_set.push(root_guard);
        if root_safe {
            ctx.header_page = None;
        }

        loop {
            let current = ctx.write_set.last().unwrap();
            if page_type_of(current.data()) == PAGE_TYPE_LEAF {
                break;
            }
            let child_id = InternalPageRef::new(current.data()).lookup(key, &*self.comparator);
            let child_guard = self.write_guard(child_id)?;
            let child_safe = Self::safe_for_insert(child_guard.data());
            ctx.write_set.push(child_guard);
            if child_safe {
                ctx.release_ancestors();
            }
        }

        let mut leaf_guard = ctx.write_set.pop().unwrap();
        let leaf_id = leaf_guard.page_id();

        {
            let leaf = LeafPageRef::new(leaf_guard.data());
            if leaf.lookup(key, &*self.comparator).is_some() {
                return Ok(false);
            }
            if leaf.size() < leaf.max_size() {
                LeafPage::new(leaf_guard.data_mut()).insert(key, value, &*self.comparator);
                return Ok(true);
            }
        }

        // Split: pool the entries plus the new pair, keep the first
        // ceil(n/2) in the old leaf, move the rest to a fresh right
        // sibling spliced into the chain.
        let mut entries = LeafPageRef::new(leaf_guard.data()).entries();
        let pos = entries
            .iter()
            .position(|&(k, _)| self.comparator.compare(k, key) != Ordering::Less)
            .unwrap_or(entries.len());
        entries.insert(pos, (key, value));
        let split_at = entries.len().div_ceil(2);
        let middle_key = entries[split_at].0;
        let old_next = LeafPageRef::new(leaf_guard.data()).next_page_id();

        let new_leaf_id = Self::allocate_page(&self.bpm)?;
        {
            let mut new_leaf_guard = self.write_guard(new_leaf_id)?;
            let mut new_leaf = LeafPage::init(new_leaf_guard.data_mut(), self.leaf_max_size);
            new_leaf.write_entries(&entries[split_at..]);
            new_leaf.set_next_page_id(old_next);
        }
        {
            let mut leaf = LeafPage::new(leaf_guard.data_mut());
            leaf.write_entries(&entries[..split_at]);
            leaf.set_next_page_id(new_leaf_id);
        }
        debug!("split leaf {leaf_id}, new sibling {new_leaf_id}");
        drop(leaf_guard);

        self.insert_into_parent(&mut ctx, leaf_id, middle_key, new_leaf_id)?;
        Ok(true)
    }

    /// Hooks a freshly split-off node into the tree: into the retained
    /// parent when there is one, else via a new root.
    fn insert_into_parent(
        &self,
        ctx: &mut Context,
        left_id: PageId,
        key: i64,
        right_id: PageId,
    ) -> Result<()> {
        let Some(mut parent_guard) = ctx.write_set.pop() else {
            // `left` was the root.
            let new_root_id = Self::allocate_page(&self.bpm)?;
            let mut root_guard = self.write_guard(new_root_id)?;
            InternalPage::init(root_guard.data_mut(), self.internal_max_size)
                .populate_new_root(left_id, key, right_id);
            let header = ctx
                .header_page
                .as_mut()
                .expect("header guard is retained whenever the root may split");
            HeaderPage::new(header.data_mut()).set_root_page_id(new_root_id);
            debug!("grew tree with new root {new_root_id}");
            return Ok(());
        };

        let parent_id = parent_guard.page_id();

        {
            let parent = InternalPageRef::new(parent_guard.data());
            if parent.size() < parent.max_size() {
                drop(parent);
                InternalPage::new(parent_guard.data_mut()).insert_after(left_id, key, right_id);
                return Ok(());
            }
        }

        // Split the parent: pool its entries plus the new one, keep the
        // first ceil(m/2) children, promote the pivot.
        let mut entries = InternalPageRef::new(parent_guard.data()).entries();
        let at = entries
            .iter()
            .position(|&(_, child)| child == left_id)
            .expect("split child must be present in its parent")
            + 1;
        entries.insert(at, (key, right_id));
        let left_count = entries.len().div_ceil(2);
        let pivot = entries[left_count].0;

        let new_internal_id = Self::allocate_page(&self.bpm)?;
        {
            let mut new_guard = self.write_guard(new_internal_id)?;
            InternalPage::init(new_guard.data_mut(), self.internal_max_size)
                .write_entries(&entries[left_count..]);
        }
        InternalPage::new(parent_guard.data_mut()).write_entries(&entries[..left_count]);
        debug!("split internal {parent_id}, new sibling {new_internal_id}");
        drop(parent_guard);

        self.insert_into_parent(ctx, parent_id, pivot, new_internal_id)
    }

    /// Removes a key; absent keys are ignored.
    pub fn remove(&self, key: i64) -> Result<()> {
        let mut ctx = Context {
            header_page: Some(self.write_guard(self.header_page_id)?),
            write_set: Vec::new(),
        };
        let root_id =
            HeaderPageRef::new(ctx.header_page.as_ref().unwrap().data()).root_page_id();
        if !root_id.is_valid() {
            return Ok(());
        }

        let root_guard = self.write_guard(root_id)?;
        let root_safe = Self::root_safe_for_delete(root_guard.data());
        ctx.write_set.push(root_guard);
        if root_safe {
            ctx.header_page = None;
        }

        loop {
            let current = ctx.write_set.last().unwrap();
            if page_type_of(current.data()) == PAGE_TYPE_LEAF {
                break;
            }
            let child_id = InternalPageRef::new(current.data()).lookup(key, &*self.comparator);
            let child_guard = self.write_guard(child_id)?;
            let child_safe = Self::safe_for_delete(child_guard.data());
            ctx.write_set.push(child_guard);
            if child_safe {
                ctx.release_ancestors();
            }
        }

        {
            let leaf_guard = ctx.write_set.last_mut().unwrap();
            if !LeafPage::new(leaf_guard.data_mut()).remove(key, &*self.comparator) {
                return Ok(());
            }
        }

        self.fix_underflow(&mut ctx)
    }

    /// Restores size invariants bottom-up after a removal. The deepest
    /// retained guard is the node that shrank; merging may propagate the
    /// underflow to the next retained ancestor.
    fn fix_underflow(&self, ctx: &mut Context) -> Result<()> {
        loop {
            let n = ctx.write_set.len();
            debug_assert!(n >= 1, "underflow fixing requires the shrunken node");

            if n == 1 {
                return self.collapse_root(ctx);
            }

            // Check whether the deepest node actually underflowed.
            {
                let data = ctx.write_set[n - 1].data();
                let (size, min) = if page_type_of(data) == PAGE_TYPE_LEAF {
                    let leaf = LeafPageRef::new(data);
                    (leaf.size(), leaf.min_size())
                } else {
                    let node = InternalPageRef::new(data);
                    (node.size(), node.min_size())
                };
                if size >= min {
                    return Ok(());
                }
            }

            let current_id = ctx.write_set[n - 1].page_id();

            // Pick a sibling under the same parent: the right neighbour,
            // or the left one for a last child.
            let (child_index, sib_index, sibling_id, sibling_on_right) = {
                let parent = InternalPageRef::new(ctx.write_set[n - 2].data());
                let child_index = parent
                    .index_of_child(current_id)
                    .expect("underflowing node must be a child of the retained parent");
                let (sib_index, on_right) = if child_index + 1 < parent.size() {
                    (child_index + 1, true)
                } else {
                    (child_index - 1, false)
                };
                (child_index, sib_index, parent.child_at(sib_index), on_right)
            };

            let mut sibling_guard = self.write_guard(sibling_id)?;

            let action = {
                let (front, back) = ctx.write_set.split_at_mut(n - 1);
                let parent_guard = &mut front[n - 2];
                let current_guard = &mut back[0];

                if page_type_of(current_guard.data()) == PAGE_TYPE_LEAF {
                    self.fix_leaf(
                        parent_guard,
                        current_guard,
                        &mut sibling_guard,
                        child_index,
                        sib_index,
                        sibling_on_right,
                    )
                } else {
                    self.fix_internal(
                        parent_guard,
                        current_guard,
                        &mut sibling_guard,
                        child_index,
                        sib_index,
                        sibling_on_right,
                    )
                }
            };

            drop(sibling_guard);
            match action {
                FixAction::Redistributed => return Ok(()),
                FixAction::MergedSibling => {
                    ctx.write_set.pop();
                    self.bpm.delete_page(sibling_id)?;
                }
                FixAction::MergedCurrent => {
                    ctx.write_set.pop();
                    self.bpm.delete_page(current_id)?;
                }
            }
            debug!("merged around {current_id}; checking parent");
        }
    }

    /// Merge or redistribute at the leaf level. Merging always folds the
    /// right operand into the left one and patches the sibling chain.
    fn fix_leaf(
        &self,
        parent_guard: &mut WritePageGuard,
        current_guard: &mut WritePageGuard,
        sibling_guard: &mut WritePageGuard,
        child_index: usize,
        sib_index: usize,
        sibling_on_right: bool,
    ) -> FixAction {
        let (cur_size, max) = {
            let cur = LeafPageRef::new(current_guard.data());
            (cur.size(), cur.max_size())
        };
        let sib_size = LeafPageRef::new(sibling_guard.data()).size();

        if cur_size + sib_size <= max {
            let (left_guard, right_guard, removed_index) = if sibling_on_right {
                (current_guard, sibling_guard, sib_index)
            } else {
                (sibling_guard, current_guard, child_index)
            };

            let right = LeafPageRef::new(right_guard.data());
            let right_entries = right.entries();
            let right_next = right.next_page_id();

            let mut left = LeafPage::new(left_guard.data_mut());
            for (k, v) in right_entries {
                let at = left.size();
                left.insert_at(at, k, v);
            }
            left.set_next_page_id(right_next);

            InternalPage::new(parent_guard.data_mut()).remove_at(removed_index);

            return if sibling_on_right {
                FixAction::MergedSibling
            } else {
                FixAction::MergedCurrent
            };
        }

        // Borrow one entry from the richer sibling and refresh the
        // separating key.
        if sibling_on_right {
            let (k, v) = {
                let sib = LeafPageRef::new(sibling_guard.data());
                (sib.key_at(0), sib.value_at(0))
            };
            LeafPage::new(sibling_guard.data_mut()).remove_at(0);
            let mut cur = LeafPage::new(current_guard.data_mut());
            let at = cur.size();
            cur.insert_at(at, k, v);
            let new_separator = LeafPageRef::new(sibling_guard.data()).key_at(0);
            InternalPage::new(parent_guard.data_mut()).set_key_at(sib_index, new_separator);
        } else {
            let (k, v) = {
                let sib = LeafPageRef::new(sibling_guard.data());
                let last = sib.size() - 1;
                (sib.key_at(last), sib.value_at(last))
            };
            {
                let mut sib = LeafPage::new(sibling_guard.data_mut());
                let last = sib.size() - 1;
                sib.remove_at(last);
            }
            LeafPage::new(current_guard.data_mut()).insert_at(0, k, v);
            InternalPage::new(parent_guard.data_mut()).set_key_at(child_index, k);
        }
        FixAction::Redistributed
    }

    /// Merge or redistribute at an internal level; the separating key in
    /// the parent travels down as the "middle" key of the merge or
    /// rotates through the parent on redistribution.
    fn fix_internal(
        &self,
        parent_guard: &mut WritePageGuard,
        current_guard: &mut WritePageGuard,
        sibling_guard: &mut WritePageGuard,
        child_index: usize,
        sib_index: usize,
        sibling_on_right: bool,
    ) -> FixAction {
        let (cur_size, max) = {
            let cur = InternalPageRef::new(current_guard.data());
            (cur.size(), cur.max_size())
        };
        let sib_size = InternalPageRef::new(sibling_guard.data()).size();

        if cur_size + sib_size <= max {
            let (left_guard, right_guard, removed_index) = if sibling_on_right {
                (current_guard, sibling_guard, sib_index)
            } else {
                (sibling_guard, current_guard, child_index)
            };
            let separator = InternalPageRef::new(parent_guard.data()).key_at(removed_index);

            let right_entries = InternalPageRef::new(right_guard.data()).entries();
            let mut left = InternalPage::new(left_guard.data_mut());
            for (i, &(k, child)) in right_entries.iter().enumerate() {
                // The right node's first child is separated from the left
                // node by the parent's key, not by its own slot-0 key.
                let key = if i == 0 { separator } else { k };
                left.push_back(key, child);
            }

            InternalPage::new(parent_guard.data_mut()).remove_at(removed_index);

            return if sibling_on_right {
                FixAction::MergedSibling
            } else {
                FixAction::MergedCurrent
            };
        }

        if sibling_on_right {
            // Rotate the sibling's first child through the parent.
            let separator = InternalPageRef::new(parent_guard.data()).key_at(sib_index);
            let (moved_child, next_separator) = {
                let sib = InternalPageRef::new(sibling_guard.data());
                (sib.child_at(0), sib.key_at(1))
            };
            InternalPage::new(current_guard.data_mut()).push_back(separator, moved_child);
            InternalPage::new(sibling_guard.data_mut()).remove_at(0);
            InternalPage::new(parent_guard.data_mut()).set_key_at(sib_index, next_separator);
        } else {
            // Rotate the sibling's last child through the parent.
            let separator = InternalPageRef::new(parent_guard.data()).key_at(child_index);
            let (moved_child, moved_key) = {
                let sib = InternalPageRef::new(sibling_guard.data());
                let last = sib.size() - 1;
                (sib.child_at(last), sib.key_at(last))
            };
            {
                let mut sib = InternalPage::new(sibling_guard.data_mut());
                let last = sib.size() - 1;
                sib.remove_at(last);
            }
            InternalPage::new(current_guard.data_mut()).push_front(moved_child, separator);
            InternalPage::new(parent_guard.data_mut()).set_key_at(child_index, moved_key);
        }
        FixAction::Redistributed
    }

    /// Shrinks the tree when the root itself ran dry: an empty leaf root
    /// empties the tree, an internal root with one child hands the root
    /// role to that child.
    fn collapse_root(&self, ctx: &mut Context) -> Result<()> {
        let root_id = ctx.write_set[0].page_id();
        let new_root = {
            let data = ctx.write_set[0].data();
            if page_type_of(data) == PAGE_TYPE_LEAF {
                if LeafPageRef::new(data).size() == 0 {
                    Some(INVALID_PAGE_ID)
                } else {
                    None
                }
            } else {
                let node = InternalPageRef::new(data);
                if node.size() == 1 {
                    Some(node.child_at(0))
                } else {
                    None
                }
            }
        };

        if let Some(new_root) = new_root {
            let header = ctx
                .header_page
                .as_mut()
                .expect("header guard is retained whenever the root may change");
            HeaderPage::new(header.data_mut()).set_root_page_id(new_root);
            ctx.write_set.pop();
            self.bpm.delete_page(root_id)?;
            debug!("root {root_id} collapsed; new root {new_root}");
        }
        Ok(())
    }

    /// Iterator positioned at the first entry of the leftmost leaf.
    pub fn begin(&self) -> Result<BPlusTreeIterator> {
        let header_guard = self.read_guard(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if !root_id.is_valid() {
            return Ok(BPlusTreeIterator::end(Arc::clone(&self.bpm)));
        }

        let mut guard = self.read_guard(root_id)?;
        drop(header_guard);
        while page_type_of(guard.data()) != PAGE_TYPE_LEAF {
            let child_id = InternalPageRef::new(guard.data()).child_at(0);
            let child_guard = self.read_guard(child_id)?;
            guard = child_guard;
        }

        BPlusTreeIterator::new(Arc::clone(&self.bpm), guard, 0)
    }

    /// Iterator positioned at the first entry with key >= `key`.
    pub fn begin_at(&self, key: i64) -> Result<BPlusTreeIterator> {
        let header_guard = self.read_guard(self.header_page_id)?;
        let root_id = HeaderPageRef::new(header_guard.data()).root_page_id();
        if !root_id.is_valid() {
            return Ok(BPlusTreeIterator::end(Arc::clone(&self.bpm)));
        }

        let mut guard = self.read_guard(root_id)?;
        drop(header_guard);
        while page_type_of(guard.data()) != PAGE_TYPE_LEAF {
            let child_id = InternalPageRef::new(guard.data()).lookup(key, &*self.comparator);
            let child_guard = self.read_guard(child_id)?;
            guard = child_guard;
        }

        let index = LeafPageRef::new(guard.data()).lower_bound(key, &*self.comparator);
        BPlusTreeIterator::new(Arc::clone(&self.bpm), guard, index)
    }

    /// End sentinel.
    pub fn end(&self) -> BPlusTreeIterator {
        BPlusTreeIterator::end(Arc::clone(&self.bpm))
    }

    /// Walks the whole tree and asserts its structural invariants: equal
    /// leaf depth, per-node size bounds, sorted keys, subtree key ranges,
    /// and a leaf chain that visits every key in non-decreasing order.
    /// Intended for tests.
    pub fn verify_integrity(&self) -> Result<()> {
        let root_id = self.root_page_id()?;
        if !root_id.is_valid() {
            return Ok(());
        }

        let mut leaf_depth = None;
        let total =
            self.verify_node(root_id, None, None, 0, &mut leaf_depth, true)?;

        // The chain must see the same entries, in order.
        let mut chained = 0usize;
        let mut previous: Option<i64> = None;
        let mut iter = self.begin()?;
        for item in &mut iter {
            let (key, _) = item?;
            if let Some(prev) = previous {
                assert!(
                    self.comparator.compare(prev, key) == Ordering::Less,
                    "leaf chain keys out of order"
                );
            }
            previous = Some(key);
            chained += 1;
        }
        assert_eq!(chained, total, "leaf chain missed or repeated entries");
        Ok(())
    }

    fn verify_node(
        &self,
        page_id: PageId,
        lower: Option<i64>,
        upper: Option<i64>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        is_root: bool,
    ) -> Result<usize> {
        let guard = self.read_guard(page_id)?;
        let cmp = &*self.comparator;

        if page_type_of(guard.data()) == PAGE_TYPE_LEAF {
            let leaf = LeafPageRef::new(guard.data());
            match *leaf_depth {
                Some(expected) => assert_eq!(depth, expected, "leaves at unequal depth"),
                None => *leaf_depth = Some(depth),
            }
            if !is_root {
                assert!(leaf.size() >= leaf.min_size(), "leaf below min size");
            }
            for i in 0..leaf.size() {
                let key = leaf.key_at(i);
                if i > 0 {
                    assert!(
                        cmp.compare(leaf.key_at(i - 1), key) == Ordering::Less,
                        "leaf keys not strictly sorted"
                    );
                }
                if let Some(lo) = lower {
                    assert!(cmp.compare(key, lo) != Ordering::Less, "key below subtree range");
                }
                if let Some(hi) = upper {
                    assert!(cmp.compare(key, hi) == Ordering::Less, "key above subtree range");
                }
            }
            return Ok(leaf.size());
        }

        let node = InternalPageRef::new(guard.data());
        if is_root {
            assert!(node.size() >= 2, "internal root must have at least 2 children");
        } else {
            assert!(node.size() >= node.min_size(), "internal node below min size");
        }

        let size = node.size();
        let mut children = Vec::with_capacity(size);
        for i in 0..size {
            if i >= 2 {
                assert!(
                    cmp.compare(node.key_at(i - 1), node.key_at(i)) == Ordering::Less,
                    "internal keys not strictly sorted"
                );
            }
            let child_lower = if i == 0 { lower } else { Some(node.key_at(i)) };
            let child_upper = if i + 1 < size { Some(node.key_at(i + 1)) } else { upper };
            children.push((node.child_at(i), child_lower, child_upper));
        }
        drop(guard);

        let mut total = 0;
        for (child, child_lower, child_upper) in children {
            total +=
                self.verify_node(child, child_lower, child_upper, depth + 1, leaf_depth, false)?;
        }
        Ok(total)
    }

    fn safe_for_insert(data: &[u8]) -> bool {
        if page_type_of(data) == PAGE_TYPE_LEAF {
            let leaf = LeafPageRef::new(data);
            leaf.size() < leaf.max_size()
        } else {
            let node = InternalPageRef::new(data);
            node.size() < node.max_size()
        }
    }

    fn safe_for_delete(data: &[u8]) -> bool {
        if page_type_of(data) == PAGE_TYPE_LEAF {
            let leaf = LeafPageRef::new(data);
            leaf.size() > leaf.min_size()
        } else {
            let node = InternalPageRef::new(data);
            node.size() > node.min_size()
        }
    }

    /// A root is safe for deletion when removing one entry cannot change
    /// who the root is.
    fn root_safe_for_delete(data: &[u8]) -> bool {
        if page_type_of(data) == PAGE_TYPE_LEAF {
            LeafPageRef::new(data).size() > 1
        } else {
            InternalPageRef::new(data).size() > 2
        }
    }

    fn allocate_page(bpm: &BufferPoolManager) -> Result<PageId> {
        let page_id = bpm.new_page();
        if !page_id.is_valid() {
            return Err(QuarryError::BufferPoolFull);
        }
        Ok(page_id)
    }

    fn read_guard(&self, page_id: PageId) -> Result<ReadPageGuard> {
        self.bpm
            .checked_read_page(page_id)?
            .ok_or(QuarryError::BufferPoolFull)
    }

    fn write_guard(&self, page_id: PageId) -> Result<WritePageGuard> {
        self.bpm
            .checked_write_page(page_id)?
            .ok_or(QuarryError::BufferPoolFull)
    }
}
