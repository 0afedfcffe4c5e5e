use super::*;

#[test]
fn parses_hex_with_and_without_hash() {
    assert_eq!(Rgb8::from_hex("#1e293b").unwrap(), Rgb8::new(0x1e, 0x29, 0x3b));
    assert_eq!(Rgb8::from_hex("F1F5F9").unwrap(), Rgb8::new(0xf1, 0xf5, 0xf9));
    assert!(Rgb8::from_hex("#12345").is_err());
    assert!(Rgb8::from_hex("#zz0000").is_err());
    assert_eq!(Rgb8::new(1, 2, 255).to_hex(), "#0102ff");
}

#[test]
fn darken_saturates_at_zero() {
    let c = Rgb8::new(100, 20, 0).darken(30);
    assert_eq!(c, Rgb8::new(70, 0, 0));
}

#[test]
fn hsl_primaries() {
    assert_eq!(Rgb8::from_hsl(0.0, 1.0, 0.5), Rgb8::new(255, 0, 0));
    assert_eq!(Rgb8::from_hsl(120.0, 1.0, 0.5), Rgb8::new(0, 255, 0));
    assert_eq!(Rgb8::from_hsl(480.0, 1.0, 0.5), Rgb8::new(0, 255, 0));
    assert_eq!(Rgb8::from_hsl(200.0, 0.0, 0.6), Rgb8::new(153, 153, 153));
}

#[test]
fn serde_uses_hex_strings() {
    let c: Rgb8 = serde_json::from_str("\"#ff3366\"").unwrap();
    assert_eq!(c, Rgb8::new(0xff, 0x33, 0x66));
    assert_eq!(serde_json::to_string(&c).unwrap(), "\"#ff3366\"");
    assert!(serde_json::from_str::<Rgb8>("\"red\"").is_err());
}

#[test]
fn lerp_endpoints() {
    let a = Rgb8::new(0, 0, 0);
    let b = Rgb8::new(200, 100, 50);
    assert_eq!(a.lerp(b, 0.0), a);
    assert_eq!(a.lerp(b, 1.0), b);
    assert_eq!(a.lerp(b, 0.5), Rgb8::new(100, 50, 25));
}
