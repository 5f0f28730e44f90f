//! Merging of nearby drawing rectangles into diagram regions.

use paperscope_core::Region;

/// Merge regions that are within `padding` of each other.
///
/// Two regions belong to the same group when one of them, grown by `padding`
/// on every side, strictly overlaps the other; groups are closed under that
/// relation, so chains of near neighbours collapse into one region. Each
/// output region is the bounding union of its group. Output order follows the
/// first member of each group in the input.
pub fn merge_regions(regions: &[Region], padding: f32) -> Vec<Region> {
    let mut merged: Vec<Region> = regions.to_vec();

    // Restart the scan after every merge: a grown region may now reach
    // neighbours that were already passed over. Stops on a scan with no merge.
    loop {
        let Some((i, j)) = find_close_pair(&merged, padding) else {
            break;
        };
        let absorbed = merged.remove(j);
        merged[i] = merged[i].union(&absorbed);
    }

    merged
}

fn find_close_pair(regions: &[Region], padding: f32) -> Option<(usize, usize)> {
    for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            if regions[i].is_close(&regions[j], padding) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x0: f32, y0: f32, x1: f32, y1: f32) -> Region {
        Region::new(x0, y0, x1, y1)
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_regions(&[], 50.0).is_empty());
    }

    #[test]
    fn test_distant_regions_stay_apart() {
        let input = vec![r(0.0, 0.0, 10.0, 10.0), r(200.0, 200.0, 210.0, 210.0)];
        assert_eq!(merge_regions(&input, 50.0), input);
    }

    #[test]
    fn test_overlapping_regions_merge_to_union() {
        let input = vec![r(0.0, 0.0, 10.0, 10.0), r(5.0, 5.0, 20.0, 30.0)];
        assert_eq!(merge_regions(&input, 0.0), vec![r(0.0, 0.0, 20.0, 30.0)]);
    }

    #[test]
    fn test_padding_is_strict() {
        // Gap of exactly the padding: expanded edge touches but does not overlap.
        let input = vec![r(0.0, 0.0, 10.0, 10.0), r(60.0, 0.0, 70.0, 10.0)];
        assert_eq!(merge_regions(&input, 50.0).len(), 2);
        assert_eq!(merge_regions(&input, 50.5).len(), 1);
    }

    #[test]
    fn test_rects_forty_apart() {
        let input = vec![r(0.0, 0.0, 100.0, 80.0), r(140.0, 20.0, 240.0, 120.0)];
        assert_eq!(merge_regions(&input, 50.0), vec![r(0.0, 0.0, 240.0, 120.0)]);
        assert_eq!(merge_regions(&input, 10.0), input);
    }

    #[test]
    fn test_chain_merges_transitively() {
        // a-b and b-c are close, a-c are not.
        let input = vec![
            r(0.0, 0.0, 10.0, 10.0),
            r(200.0, 0.0, 210.0, 10.0),
            r(40.0, 0.0, 50.0, 10.0),
            r(80.0, 0.0, 90.0, 10.0),
            r(120.0, 0.0, 130.0, 10.0),
            r(160.0, 0.0, 170.0, 10.0),
        ];
        let merged = merge_regions(&input, 35.0);
        assert_eq!(merged, vec![r(0.0, 0.0, 210.0, 10.0)]);
    }

    #[test]
    fn test_growth_reaches_earlier_region() {
        // Merging b and c produces a region that now reaches a.
        let input = vec![
            r(40.0, 100.0, 48.0, 110.0),
            r(50.0, 0.0, 60.0, 10.0),
            r(55.0, 5.0, 65.0, 105.0),
        ];
        let merged = merge_regions(&input, 5.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0], r(40.0, 0.0, 65.0, 110.0));
    }

    #[test]
    fn test_outputs_cover_inputs_and_are_pairwise_apart() {
        let input = vec![
            r(0.0, 0.0, 30.0, 30.0),
            r(35.0, 0.0, 60.0, 20.0),
            r(300.0, 300.0, 320.0, 340.0),
            r(500.0, 10.0, 520.0, 30.0),
            r(330.0, 345.0, 360.0, 360.0),
        ];
        let padding = 10.0;
        let merged = merge_regions(&input, padding);

        for region in &input {
            assert!(merged.iter().any(|m| m.contains(region)));
        }
        for (i, a) in merged.iter().enumerate() {
            for b in merged.iter().skip(i + 1) {
                assert!(!a.is_close(b, padding));
            }
        }
    }
}
