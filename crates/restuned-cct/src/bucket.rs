use slab::Slab;

use restuned_types::{Handle, Resource};

/// One node in a priority bucket's arbitration list. Lives in the bucket's
/// `Slab` and is only ever addressed by its stable slab key, never by a raw
/// pointer — re-expressing the source's intrusive doubly-linked list as an
/// arena plus index.
pub(crate) struct Entry {
    pub handle: Handle,
    pub resource: Resource,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// An ordered list of active tune requests for one (resource, scope
/// coordinate, priority) triple. The head is the winning node.
#[derive(Default)]
pub(crate) struct Bucket {
    slab: Slab<Entry>,
    pub head: Option<usize>,
    pub tail: Option<usize>,
}

impl Bucket {
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn head_entry(&self) -> Option<&Entry> {
        self.head.and_then(|key| self.slab.get(key))
    }

    pub fn entry(&self, key: usize) -> Option<&Entry> {
        self.slab.get(key)
    }

    pub fn push_front(&mut self, handle: Handle, resource: Resource) -> usize {
        let key = self.slab.insert(Entry { handle, resource, prev: None, next: self.head });
        if let Some(old_head) = self.head {
            self.slab[old_head].prev = Some(key);
        } else {
            self.tail = Some(key);
        }
        self.head = Some(key);
        key
    }

    pub fn push_back(&mut self, handle: Handle, resource: Resource) -> usize {
        let key = self.slab.insert(Entry { handle, resource, prev: self.tail, next: None });
        if let Some(old_tail) = self.tail {
            self.slab[old_tail].next = Some(key);
        } else {
            self.head = Some(key);
        }
        self.tail = Some(key);
        key
    }

    /// Insert just before the first node this resource is strictly better
    /// than (per `is_better`); ties keep existing FIFO order by landing
    /// after every equal node. Falls back to tail insertion.
    pub fn insert_sorted(
        &mut self,
        handle: Handle,
        resource: Resource,
        is_better: impl Fn(&Resource, &Resource) -> bool,
    ) -> usize {
        let mut cursor = self.head;
        while let Some(node) = cursor {
            if is_better(&resource, &self.slab[node].resource) {
                break;
            }
            cursor = self.slab[node].next;
        }

        match cursor {
            None => self.push_back(handle, resource),
            Some(before) => {
                let prev = self.slab[before].prev;
                let key = self.slab.insert(Entry { handle, resource, prev, next: Some(before) });
                self.slab[before].prev = Some(key);
                match prev {
                    Some(p) => self.slab[p].next = Some(key),
                    None => self.head = Some(key),
                }
                key
            }
        }
    }

    /// Detach and return the node's resource and whether it was the head.
    pub fn remove(&mut self, key: usize) -> Option<(Resource, bool)> {
        if !self.slab.contains(key) {
            return None;
        }
        let was_head = self.head == Some(key);
        let Entry { resource, prev, next, .. } = self.slab.remove(key);

        match prev {
            Some(p) => self.slab[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slab[n].prev = prev,
            None => self.tail = prev,
        }

        Some((resource, was_head))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use restuned_types::ResourceCode;

    fn res(v: i32) -> Resource {
        Resource::new(ResourceCode::new(1, 1), vec![v])
    }

    #[test]
    fn push_front_then_back_preserves_order() {
        let mut b = Bucket::default();
        let a = b.push_back(1, res(10));
        let c = b.push_back(2, res(20));
        assert_eq!(b.head, Some(a));
        assert_eq!(b.tail, Some(c));
    }

    #[test]
    fn higher_better_tie_break_keeps_fifo_among_equals() {
        let mut b = Bucket::default();
        let is_better = |n: &Resource, t: &Resource| n.arbitration_value() > t.arbitration_value();
        let first = b.insert_sorted(1, res(10), is_better);
        let second = b.insert_sorted(2, res(10), is_better);
        // equal values: second goes after first, head stays first
        assert_eq!(b.head, Some(first));
        assert_eq!(b.entry(first).unwrap().next, Some(second));
    }

    #[test]
    fn higher_better_inserts_stronger_value_at_head() {
        let mut b = Bucket::default();
        let is_better = |n: &Resource, t: &Resource| n.arbitration_value() > t.arbitration_value();
        let low = b.insert_sorted(1, res(10), is_better);
        let high = b.insert_sorted(2, res(20), is_better);
        assert_eq!(b.head, Some(high));
        assert_eq!(b.entry(high).unwrap().next, Some(low));
    }

    #[test]
    fn remove_head_promotes_next() {
        let mut b = Bucket::default();
        let a = b.push_back(1, res(10));
        let c = b.push_back(2, res(20));
        let (_, was_head) = b.remove(a).unwrap();
        assert!(was_head);
        assert_eq!(b.head, Some(c));
    }

    #[test]
    fn remove_last_node_empties_bucket() {
        let mut b = Bucket::default();
        let a = b.push_back(1, res(10));
        b.remove(a).unwrap();
        assert!(b.is_empty());
        assert!(b.tail.is_none());
    }
}
