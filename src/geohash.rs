/// Standard base32 geohash, the spatial key for roughness map cells.
///
/// Precision 8 gives cells of roughly 38 m × 19 m.
pub const SEGMENT_PRECISION: usize = 8;

const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Encode `(lat, lng)` in degrees to a geohash of `precision` characters.
///
/// Bits interleave starting with longitude.
pub fn encode(lat: f64, lng: f64, precision: usize) -> String {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);
    let lat = lat.clamp(-90.0, 90.0);
    let lng = lng.clamp(-180.0, 180.0);

    let mut hash = String::with_capacity(precision);
    let mut even_bit = true;
    let mut bit = 0;
    let mut idx = 0usize;

    while hash.len() < precision {
        let (range, value) = if even_bit { (&mut lng_range, lng) } else { (&mut lat_range, lat) };
        let mid = (range.0 + range.1) / 2.0;
        if value >= mid {
            idx = idx * 2 + 1;
            range.0 = mid;
        } else {
            idx *= 2;
            range.1 = mid;
        }
        even_bit = !even_bit;

        bit += 1;
        if bit == 5 {
            hash.push(BASE32[idx] as char);
            bit = 0;
            idx = 0;
        }
    }
    hash
}

/// Bounding box `(min_lat, min_lng, max_lat, max_lng)` of a geohash cell.
///
/// Returns `None` for characters outside the geohash alphabet.
pub fn decode_bbox(hash: &str) -> Option<(f64, f64, f64, f64)> {
    let mut lat_range = (-90.0_f64, 90.0_f64);
    let mut lng_range = (-180.0_f64, 180.0_f64);
    let mut even_bit = true;

    for c in hash.bytes() {
        let idx = BASE32.iter().position(|&b| b == c.to_ascii_lowercase())?;
        for shift in (0..5).rev() {
            let range = if even_bit { &mut lng_range } else { &mut lat_range };
            let mid = (range.0 + range.1) / 2.0;
            if (idx >> shift) & 1 == 1 {
                range.0 = mid;
            } else {
                range.1 = mid;
            }
            even_bit = !even_bit;
        }
    }
    Some((lat_range.0, lng_range.0, lat_range.1, lng_range.1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_hashes() {
        assert_eq!(encode(57.64911, 10.40744, 11), "u4pruydqqvj");
        assert_eq!(encode(57.64911, 10.40744, SEGMENT_PRECISION), "u4pruydq");
        assert_eq!(encode(42.6, -5.6, 5), "ezs42");
    }

    #[test]
    fn test_point_lies_inside_its_cell() {
        let (lat, lng) = (32.2319, -110.9501);
        let hash = encode(lat, lng, SEGMENT_PRECISION);
        let (min_lat, min_lng, max_lat, max_lng) = decode_bbox(&hash).unwrap();
        assert!(min_lat <= lat && lat <= max_lat);
        assert!(min_lng <= lng && lng <= max_lng);
        // ~19 m of latitude, ~38 m of longitude at the equator
        assert!((max_lat - min_lat) < 0.0002);
        assert!((max_lng - min_lng) < 0.0004);
    }

    #[test]
    fn test_rejects_invalid_characters() {
        assert!(decode_bbox("u4pa").is_none());
    }
}
