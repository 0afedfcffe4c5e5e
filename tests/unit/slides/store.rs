use super::*;

struct FixedPages(Vec<Page>);

impl Rasterizer for FixedPages {
    fn rasterize(&self, _bytes: &[u8]) -> SlidecastResult<Vec<Page>> {
        Ok(self.0.clone())
    }
}

fn three_pages() -> Vec<Page> {
    vec![
        Page::solid(0, 4, 3, [255, 0, 0]),
        Page::solid(0, 4, 3, [0, 255, 0]),
        Page::solid(0, 4, 3, [0, 0, 255]),
    ]
}

#[test]
fn replace_reindexes_and_resets_cursor() {
    let mut store = SlideStore::new();
    assert_eq!(store.replace(three_pages()).unwrap(), 3);
    store.select(2).unwrap();
    assert_eq!(store.active_index(), 2);

    let indices: Vec<usize> = store
        .document()
        .unwrap()
        .pages()
        .iter()
        .map(|p| p.index)
        .collect();
    assert_eq!(indices, vec![0, 1, 2]);

    store.replace(vec![Page::solid(7, 2, 2, [1, 1, 1])]).unwrap();
    assert_eq!(store.active_index(), 0);
    assert_eq!(store.get(0).unwrap().index, 0);
}

#[test]
fn malformed_document_keeps_previous_state() {
    let mut store = SlideStore::new();
    store.replace(three_pages()).unwrap();
    store.select(1).unwrap();
    let gen_before = store.document().unwrap().generation();

    let mut bad = three_pages();
    bad[2].rgba8_premul = Arc::new(vec![0u8; 5]);
    let err = store
        .load(b"ignored", &FixedPages(bad))
        .expect_err("truncated page must be rejected");
    assert!(matches!(err, SlidecastError::Decode(_)));

    assert_eq!(store.page_count(), 3);
    assert_eq!(store.active_index(), 1);
    assert_eq!(store.document().unwrap().generation(), gen_before);

    assert!(store.replace(Vec::new()).is_err());
    assert!(store.replace(vec![Page::solid(0, 0, 5, [0, 0, 0])]).is_err());
}

#[test]
fn generation_changes_on_every_replace() {
    let mut store = SlideStore::new();
    store.replace(three_pages()).unwrap();
    let a = store.document().unwrap().generation();
    store.replace(three_pages()).unwrap();
    let b = store.document().unwrap().generation();
    assert_ne!(a, b);
}

#[test]
fn navigation_saturates_and_select_checks_range() {
    let mut store = SlideStore::new();
    assert_eq!(store.next(), 0);
    assert!(matches!(store.select(0), Err(SlidecastError::NotFound(_))));

    store.replace(three_pages()).unwrap();
    assert_eq!(store.prev(), 0);
    assert_eq!(store.next(), 1);
    assert_eq!(store.next(), 2);
    assert_eq!(store.next(), 2);
    assert!(store.select(3).is_err());
    assert_eq!(store.active_index(), 2);
    assert_eq!(store.prev(), 1);
}

#[test]
fn get_reports_not_found() {
    let mut store = SlideStore::new();
    assert!(matches!(store.get(0), Err(SlidecastError::NotFound(_))));
    store.replace(three_pages()).unwrap();
    assert!(store.get(2).is_ok());
    assert!(matches!(store.get(3), Err(SlidecastError::NotFound(_))));
    store.clear();
    assert_eq!(store.page_count(), 0);
}

#[test]
fn from_rgba8_premultiplies() {
    let page = Page::from_rgba8(0, 1, 1, vec![255, 255, 255, 128]);
    assert_eq!(page.rgba8_premul.as_slice(), &[128, 128, 128, 128]);
}
