use super::*;
use image::Rgba;
use std::sync::Mutex;

#[derive(Clone, Default)]
struct FakeLoader {
    missing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl ImageLoader for FakeLoader {
    fn load(&self, path: &Path) -> FlipreelResult<RgbaImage> {
        if self.missing.lock().unwrap().contains(path) {
            return Err(anyhow::anyhow!("no such file").into());
        }
        Ok(RgbaImage::from_pixel(1, 1, Rgba([200, 100, 0, 255])))
    }
}

#[test]
fn normalize_folds_dots() {
    assert_eq!(
        normalize_path(Path::new("/a/./b/../c.png")),
        PathBuf::from("/a/c.png")
    );
    assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    assert_eq!(normalize_path(Path::new("a/..")), PathBuf::from("."));
    assert_eq!(
        normalize_asset_path(Path::new("/anim/frames"), "../walk01.png"),
        PathBuf::from("/anim/walk01.png")
    );
}

#[test]
fn equivalent_paths_share_one_entry() {
    let mut cache = AssetCache::with_loader(FakeLoader::default());
    let a = cache.get(Path::new("/f/walk01.png"), false).unwrap();
    let b = cache.get(Path::new("/f/./x/../walk01.png"), false).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.load_count(Path::new("/f/walk01.png")), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn inverted_variant_comes_from_the_same_decode() {
    let mut cache = AssetCache::with_loader(FakeLoader::default());
    let path = Path::new("/f/a.png");
    assert!(cache.peek(path, true).is_none());

    let inv = cache.get(path, true).unwrap();
    assert_eq!(inv.get_pixel(0, 0), &Rgba([55, 155, 255, 255]));
    let plain = cache.get(path, false).unwrap();
    assert_eq!(plain.get_pixel(0, 0), &Rgba([200, 100, 0, 255]));
    assert_eq!(cache.load_count(path), 1);
    assert!(cache.peek(path, true).is_some());
}

#[test]
fn invalidate_forces_exactly_one_reload() {
    let mut cache = AssetCache::with_loader(FakeLoader::default());
    let path = Path::new("/f/a.png");
    cache.get(path, false).unwrap();
    cache.get(path, false).unwrap();
    assert_eq!(cache.load_count(path), 1);

    assert!(cache.invalidate(path));
    assert!(!cache.contains(path));
    assert!(!cache.invalidate(path));

    cache.get(path, false).unwrap();
    cache.get(path, true).unwrap();
    assert_eq!(cache.load_count(path), 2);
}

#[test]
fn failures_are_not_cached_and_retry() {
    let loader = FakeLoader::default();
    let missing = loader.missing.clone();
    let path = PathBuf::from("/f/gone.png");
    missing.lock().unwrap().insert(path.clone());

    let mut cache = AssetCache::with_loader(loader);
    let err = cache.get(&path, false).unwrap_err();
    assert!(matches!(err, FlipreelError::AssetLoad { .. }));
    assert!(!cache.contains(&path));
    assert!(cache.was_requested(&path));

    missing.lock().unwrap().clear();
    cache.get(&path, false).unwrap();
    assert_eq!(cache.load_count(&path), 2);
}

#[test]
fn watch_requests_are_queued_once_per_path() {
    let loader = FakeLoader::default();
    loader
        .missing
        .lock()
        .unwrap()
        .insert(PathBuf::from("/f/b.png"));
    let mut cache = AssetCache::with_loader(loader);

    cache.get(Path::new("/f/a.png"), false).unwrap();
    let _ = cache.get(Path::new("/f/b.png"), false);
    let _ = cache.get(Path::new("/f/b.png"), false);
    cache.invalidate(Path::new("/f/a.png"));
    cache.get(Path::new("/f/a.png"), false).unwrap();

    let reqs = cache.take_watch_requests();
    assert_eq!(
        reqs,
        vec![
            WatchRequest {
                path: PathBuf::from("/f/a.png"),
                loaded: true
            },
            WatchRequest {
                path: PathBuf::from("/f/b.png"),
                loaded: false
            },
        ]
    );
    assert!(cache.take_watch_requests().is_empty());
}
