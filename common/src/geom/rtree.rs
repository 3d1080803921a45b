use super::rect::Rect;
use rstar::{AABB, RTree};

/// Rectangle-keyed R-tree carrying an arbitrary payload.
pub struct SpatialIndex<T> {
    tree: RTree<IndexedRect<T>>,
}

pub struct IndexedRect<T> {
    pub rect: Rect,
    pub item: T,
}

impl<T> rstar::RTreeObject for IndexedRect<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_aabb(&self.rect)
    }
}

fn to_aabb(rect: &Rect) -> AABB<[f64; 2]> {
    AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y])
}

impl<T> Default for SpatialIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SpatialIndex<T> {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn bulk_load(items: Vec<(Rect, T)>) -> Self {
        let objects = items
            .into_iter()
            .map(|(rect, item)| IndexedRect { rect, item })
            .collect();
        Self {
            tree: RTree::bulk_load(objects),
        }
    }

    pub fn insert(&mut self, rect: Rect, item: T) {
        self.tree.insert(IndexedRect { rect, item });
    }

    /// Everything whose envelope intersects `rect`, touching edges included.
    pub fn query<'a>(&'a self, rect: &Rect) -> impl Iterator<Item = &'a IndexedRect<T>> + use<'a, T> {
        self.tree.locate_in_envelope_intersecting(&to_aabb(rect))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::point::Point;

    #[test]
    fn query_includes_touching_rects() {
        let index = SpatialIndex::bulk_load(vec![
            (Rect::new(Point::new(0.0, 0.0), Point::new(2.0, 2.0)), "a"),
            (Rect::new(Point::new(5.0, 5.0), Point::new(6.0, 6.0)), "b"),
        ]);
        let window = Rect::new(Point::new(2.0, 1.0), Point::new(4.0, 3.0));
        let hits: Vec<&str> = index.query(&window).map(|hit| hit.item).collect();
        assert_eq!(hits, vec!["a"]);
    }
}
