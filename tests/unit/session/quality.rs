use super::*;

#[test]
fn table_is_exact() {
    assert_eq!(
        Quality::Hd.geometry(),
        Geometry {
            width: 1280,
            height: 720,
            bitrate: 3_000_000
        }
    );
    assert_eq!(
        Quality::Fhd.geometry(),
        Geometry {
            width: 1920,
            height: 1080,
            bitrate: 5_000_000
        }
    );
    assert_eq!(
        Quality::Uhd4k.geometry(),
        Geometry {
            width: 3840,
            height: 2160,
            bitrate: 15_000_000
        }
    );
}

#[test]
fn labels_and_serde_names() {
    assert_eq!(Quality::Uhd4k.to_string(), "4K");
    assert_eq!(serde_json::to_string(&Quality::Uhd4k).unwrap(), "\"4k\"");
    let q: Quality = serde_json::from_str("\"hd\"").unwrap();
    assert_eq!(q, Quality::Hd);
    assert_eq!(Quality::default(), Quality::Fhd);
}

#[test]
fn every_preset_is_even_sized() {
    for q in Quality::ALL {
        let g = q.geometry();
        assert!(g.width % 2 == 0 && g.height % 2 == 0, "{q}");
    }
}
