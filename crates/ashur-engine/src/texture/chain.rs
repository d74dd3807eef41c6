/// Insertion-ordered list of pictures with resident textures.
///
/// Links live in a side table indexed by arena slot, giving O(1) link and
/// unlink. Eviction walks this order (oldest load first), not recency.
#[derive(Debug, Default)]
pub(crate) struct LoadedChain {
    links: Vec<Link>,
    head: Option<u32>,
    tail: Option<u32>,
    len: usize,
}

#[derive(Debug, Default, Copy, Clone)]
struct Link {
    prev: Option<u32>,
    next: Option<u32>,
    linked: bool,
}

impl LoadedChain {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn contains(&self, index: u32) -> bool {
        self.links.get(index as usize).is_some_and(|l| l.linked)
    }

    /// Appends `index` at the tail; already linked entries keep their place.
    pub fn link(&mut self, index: u32) {
        let i = index as usize;
        if self.links.len() <= i {
            self.links.resize(i + 1, Link::default());
        }
        if self.links[i].linked {
            return;
        }

        self.links[i] = Link {
            prev: self.tail,
            next: None,
            linked: true,
        };
        match self.tail {
            Some(t) => self.links[t as usize].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
        self.len += 1;
    }

    pub fn unlink(&mut self, index: u32) {
        if !self.contains(index) {
            return;
        }
        let Link { prev, next, .. } = self.links[index as usize];

        match prev {
            Some(p) => self.links[p as usize].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.links[n as usize].prev = prev,
            None => self.tail = prev,
        }
        self.links[index as usize] = Link::default();
        self.len -= 1;
    }

    /// Linked indices, head to tail.
    pub fn iter(&self) -> ChainIter<'_> {
        ChainIter {
            chain: self,
            cursor: self.head,
        }
    }
}

pub(crate) struct ChainIter<'a> {
    chain: &'a LoadedChain,
    cursor: Option<u32>,
}

impl Iterator for ChainIter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.cursor?;
        self.cursor = self.chain.links[current as usize].next;
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(chain: &LoadedChain) -> Vec<u32> {
        chain.iter().collect()
    }

    #[test]
    fn keeps_insertion_order_across_unlinks() {
        let mut chain = LoadedChain::default();
        for i in [4, 1, 7, 2] {
            chain.link(i);
        }
        chain.link(1);
        assert_eq!(order(&chain), vec![4, 1, 7, 2]);

        chain.unlink(7);
        chain.unlink(4);
        assert_eq!(order(&chain), vec![1, 2]);

        chain.link(4);
        assert_eq!(order(&chain), vec![1, 2, 4]);
        assert_eq!(chain.len(), 3);
    }

    #[test]
    fn unlinking_everything_empties_the_chain() {
        let mut chain = LoadedChain::default();
        chain.link(0);
        chain.link(3);
        chain.unlink(3);
        chain.unlink(0);
        chain.unlink(9);
        assert_eq!(chain.len(), 0);
        assert!(chain.iter().next().is_none());
    }
}
