// gallery.rs - single-slide carousel used inside the modal

use crate::spot::GalleryItem;

/// Horizontal travel (overlay units) that turns a drag into a slide change.
pub const SWIPE_THRESHOLD: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
}

/// One item per view, no wrap-around. Swipes are tracked here so the
/// gesture never reaches the scene's drag handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Carousel {
    items: Vec<GalleryItem>,
    index: usize,
    swipe_origin: Option<f32>,
    swipe_offset: f32,
}

impl Carousel {
    pub fn new(items: Vec<GalleryItem>) -> Self {
        Self {
            items,
            index: 0,
            swipe_origin: None,
            swipe_offset: 0.0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn current(&self) -> Option<&GalleryItem> {
        self.items.get(self.index)
    }

    pub fn has_prev(&self) -> bool {
        self.index > 0
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.items.len()
    }

    pub fn next(&mut self) -> bool {
        if self.has_next() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.has_prev() {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Pagination bullet click.
    pub fn go_to(&mut self, index: usize) -> bool {
        if index < self.items.len() && index != self.index {
            self.index = index;
            true
        } else {
            false
        }
    }

    pub fn handle_key(&mut self, key: NavKey) -> bool {
        match key {
            NavKey::Left => self.prev(),
            NavKey::Right => self.next(),
        }
    }

    pub fn begin_swipe(&mut self, x: f32) {
        self.swipe_origin = Some(x);
        self.swipe_offset = 0.0;
    }

    pub fn update_swipe(&mut self, x: f32) {
        if let Some(origin) = self.swipe_origin {
            self.swipe_offset = x - origin;
        }
    }

    /// Current drag offset, for rendering the slide under the finger.
    pub fn swipe_offset(&self) -> f32 {
        self.swipe_offset
    }

    /// Dragging left advances, dragging right goes back.
    pub fn end_swipe(&mut self) -> bool {
        let offset = self.swipe_offset;
        self.swipe_origin = None;
        self.swipe_offset = 0.0;
        if offset <= -SWIPE_THRESHOLD {
            self.next()
        } else if offset >= SWIPE_THRESHOLD {
            self.prev()
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn carousel(n: usize) -> Carousel {
        Carousel::new(
            (0..n)
                .map(|i| GalleryItem {
                    src: format!("foto{i}.jpg"),
                    alt: format!("Detalle {i}"),
                })
                .collect(),
        )
    }

    #[test]
    fn navigation_stops_at_the_ends() {
        let mut c = carousel(3);
        assert!(!c.prev());
        assert!(c.next());
        assert!(c.next());
        assert!(!c.next());
        assert_eq!(c.index(), 2);
        assert_eq!(c.current().map(|i| i.alt.as_str()), Some("Detalle 2"));
        assert!(c.handle_key(NavKey::Left));
        assert_eq!(c.index(), 1);
    }

    #[test]
    fn pagination_jumps_only_to_existing_slides() {
        let mut c = carousel(3);
        assert!(c.go_to(2));
        assert!(!c.go_to(2));
        assert!(!c.go_to(7));
        assert_eq!(c.index(), 2);
    }

    #[test]
    fn swipes_need_to_cross_the_threshold() {
        let mut c = carousel(2);
        c.begin_swipe(300.0);
        c.update_swipe(280.0);
        assert!(!c.end_swipe());
        assert_eq!(c.index(), 0);

        c.begin_swipe(300.0);
        c.update_swipe(200.0);
        assert_eq!(c.swipe_offset(), -100.0);
        assert!(c.end_swipe());
        assert_eq!(c.index(), 1);
        assert_eq!(c.swipe_offset(), 0.0);

        c.begin_swipe(0.0);
        c.update_swipe(80.0);
        assert!(c.end_swipe());
        assert_eq!(c.index(), 0);
    }

    #[test]
    fn empty_carousel_has_no_current_item() {
        let mut c = carousel(0);
        assert!(c.is_empty());
        assert!(c.current().is_none());
        assert!(!c.next());
        c.update_swipe(10.0);
        assert!(!c.end_swipe());
    }
}
