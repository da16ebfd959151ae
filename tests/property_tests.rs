// Property checks over generated inputs

use cgmath::Vector3;
use jk_tools_lib::archive::Archive;
use jk_tools_lib::hierarchy::resolve;
use jk_tools_lib::text::jkl::{sector_for_surface, Sector};
use jk_tools_lib::texture::{flip_rows, Palette};
use jk_tools_lib::DecodeError;
use proptest::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn sector(id: u32, start: usize, count: usize) -> Sector {
    Sector {
        id,
        flags: 0,
        ambient: 0.0,
        extra_light: 0.0,
        tint: [0.0; 3],
        bounding_box: [0.0; 6],
        center: Vector3::new(0.0, 0.0, 0.0),
        radius: 0.0,
        surface_start: start,
        surface_count: count,
    }
}

proptest! {
    #[test]
    fn archive_entries_extract_what_was_packed(
        payloads in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 1..8)
    ) {
        let names: Vec<String> = (0..payloads.len()).map(|i| format!("dir\\file{i}.bin")).collect();
        let files: Vec<(&str, &[u8])> = names
            .iter()
            .zip(&payloads)
            .map(|(n, p)| (n.as_str(), p.as_slice()))
            .collect();
        let archive = Archive::open(common::build_gob(&files)).unwrap();

        prop_assert_eq!(archive.entries().len(), payloads.len());
        for (i, payload) in payloads.iter().enumerate() {
            prop_assert_eq!(archive.extract(&format!("file{i}.bin")).unwrap(), payload.as_slice());
        }
    }

    #[test]
    fn flipping_rows_twice_is_identity(width in 1usize..9, height in 1usize..9, seed in any::<u8>()) {
        let pixels: Vec<u8> = (0..width * height).map(|i| (i as u8).wrapping_mul(seed)).collect();
        let flipped = flip_rows(&pixels, width);
        prop_assert_eq!(&flipped[..width], &pixels[(height - 1) * width..]);
        prop_assert_eq!(flip_rows(&flipped, width), pixels);
    }

    #[test]
    fn palette_channels_stay_in_unit_range(tail in prop::collection::vec(any::<u8>(), 256..1024)) {
        let mut bytes = common::build_cmp(1);
        bytes.truncate(bytes.len() - 256);
        bytes.extend_from_slice(&tail);
        let palette = Palette::decode(&bytes).unwrap();

        prop_assert_eq!(palette.alpha_tables.len(), tail.len() / 256);
        for index in 0..=255u8 {
            for c in palette.rgba(index) {
                prop_assert!((0.0..=1.0).contains(&c));
            }
        }
    }

    #[test]
    fn short_palettes_are_rejected(len in 0usize..17216) {
        let bytes = common::build_cmp(1);
        let result = Palette::decode(&bytes[..len]);
        prop_assert!(
            matches!(result, Err(DecodeError::CorruptPalette { required: 17216, .. })),
            "{len} bytes decoded"
        );
    }

    #[test]
    fn acyclic_hierarchies_resolve(parents in prop::collection::vec(any::<prop::sample::Index>(), 0..12)) {
        // Node i + 1 hangs under some earlier node
        let mut nodes = vec![common::node("root", 0, -1, [1.0, 0.0, 0.0])];
        for (i, pick) in parents.iter().enumerate() {
            let parent = pick.index(i + 1) as i32;
            nodes.push(common::node(&format!("n{i}"), -1, parent, [1.0, 0.0, 0.0]));
        }
        let resolved = resolve(&nodes).unwrap();
        prop_assert_eq!(resolved.len(), nodes.len());
        for node in &resolved {
            prop_assert_eq!(node.absolute_translation.x, node.chain.len() as f32);
        }
    }

    #[test]
    fn any_cycle_is_rejected(len in 2usize..10, tail in 0usize..4) {
        // A ring of `len` nodes plus a few children hanging off it
        let mut nodes: Vec<_> = (0..len)
            .map(|i| common::node(&format!("r{i}"), -1, ((i + 1) % len) as i32, [0.0; 3]))
            .collect();
        for t in 0..tail {
            nodes.push(common::node(&format!("t{t}"), -1, 0, [0.0; 3]));
        }
        prop_assert!(matches!(resolve(&nodes), Err(DecodeError::CyclicHierarchy { .. })), "expected CyclicHierarchy error");
    }

    #[test]
    fn surfaces_land_in_the_first_covering_sector(
        counts in prop::collection::vec(1usize..6, 1..6),
        surface in 0usize..40,
    ) {
        let mut start = 0;
        let sectors: Vec<Sector> = counts
            .iter()
            .enumerate()
            .map(|(i, &count)| {
                let s = sector(i as u32, start, count);
                start += count;
                s
            })
            .collect();

        match sector_for_surface(&sectors, surface) {
            Some(k) => {
                prop_assert!(sectors[k].surface_range_end() >= surface as i64);
                prop_assert!(k == 0 || sectors[k - 1].surface_range_end() < surface as i64);
                prop_assert!(sectors[k].surface_start <= surface);
            }
            None => prop_assert!(surface >= start),
        }
    }
}
