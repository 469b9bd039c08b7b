use airframe_gfx::data_structures::color_coder::{ColorCoder, IdBlock, decode_id, encode_id};

#[test]
fn fresh_block_starts_after_the_sentinel_and_is_reused() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();

    let block = coder.allocate(5, &mut codes).expect("ids available");
    assert_eq!(block, IdBlock::new(1, 5));
    assert_eq!(codes, (1..=5).map(encode_id).collect::<Vec<_>>());

    coder.free(block);
    assert_eq!(coder.watermark(), 0);
    assert!(coder.free_blocks().is_empty());

    codes.clear();
    assert_eq!(coder.allocate(5, &mut codes), Some(IdBlock::new(1, 5)));
}

#[test]
fn first_fit_carves_the_low_end() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();
    let a = coder.allocate(10, &mut codes).expect("ids available");
    let _b = coder.allocate(3, &mut codes).expect("ids available");
    coder.free(a);
    assert_eq!(coder.free_blocks(), &[IdBlock::new(1, 10)]);

    codes.clear();
    let c = coder.allocate(4, &mut codes).expect("ids available");
    assert_eq!(c, IdBlock::new(1, 4));
    assert_eq!(coder.free_blocks(), &[IdBlock::new(5, 10)]);
    assert_eq!(codes.len(), 4);

    // exact fit removes the free entry
    let d = coder.allocate(6, &mut codes).expect("ids available");
    assert_eq!(d, IdBlock::new(5, 10));
    assert!(coder.free_blocks().is_empty());
    assert_eq!(coder.watermark(), 13);
}

#[test]
fn freeing_the_top_block_retracts_the_watermark() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();
    let a = coder.allocate(2, &mut codes).expect("ids available");
    let b = coder.allocate(3, &mut codes).expect("ids available");
    let c = coder.allocate(4, &mut codes).expect("ids available");
    assert_eq!(coder.watermark(), 9);

    coder.free(b);
    assert_eq!(coder.free_blocks(), &[IdBlock::new(3, 5)]);
    // c merges with b on its left and both leave the universe
    coder.free(c);
    assert_eq!(coder.watermark(), 2);
    assert!(coder.free_blocks().is_empty());

    coder.free(a);
    assert_eq!(coder.watermark(), 0);
}

#[test]
fn neighbours_merge_on_both_sides() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();
    let blocks: Vec<IdBlock> = (0..4)
        .map(|_| coder.allocate(2, &mut codes).expect("ids available"))
        .collect();

    coder.free(blocks[0]);
    coder.free(blocks[2]);
    assert_eq!(coder.free_blocks().len(), 2);
    coder.free(blocks[1]);
    assert_eq!(coder.free_blocks(), &[IdBlock::new(1, 6)]);
    assert_eq!(coder.watermark(), 8);
}

#[test]
fn churn_that_nets_to_empty_restores_the_allocator() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();
    let keep = coder.allocate(3, &mut codes).expect("ids available");
    let before = coder.clone();

    // deterministic pseudo-random alloc/free sequence
    let mut seed = 0x2545_f491_u32;
    let mut live: Vec<IdBlock> = Vec::new();
    for _ in 0..500 {
        seed ^= seed << 13;
        seed ^= seed >> 17;
        seed ^= seed << 5;
        if seed % 3 != 0 || live.is_empty() {
            let count = seed % 17 + 1;
            let block = coder.allocate(count, &mut codes).expect("ids available");
            for other in &live {
                assert!(!block.overlaps(other), "{block:?} overlaps {other:?}");
            }
            assert!(!block.overlaps(&keep));
            live.push(block);
        } else {
            let idx = (seed as usize / 3) % live.len();
            coder.free(live.swap_remove(idx));
        }
    }
    while let Some(block) = live.pop() {
        coder.free(block);
    }

    assert_eq!(coder, before);
    assert_eq!(coder.watermark(), keep.end);
    assert!(coder.free_blocks().is_empty());
}

#[test]
fn degenerate_frees_are_ignored() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();
    coder.allocate(4, &mut codes).expect("ids available");
    let before = coder.clone();

    coder.free(IdBlock::new(0, 3));
    coder.free(IdBlock::new(3, 2));
    assert_eq!(coder, before);
}

#[test]
fn zero_count_returns_none() {
    let mut coder = ColorCoder::new();
    let mut codes = Vec::new();
    assert_eq!(coder.allocate(0, &mut codes), None);
    assert!(codes.is_empty());
    assert_eq!(coder.watermark(), 0);
}

#[test]
fn codec_round_trips_and_zero_is_background() {
    for id in [1, 2, 255, 256, 0x00ab_cdef, 0x1234_5678, u32::MAX - 1, u32::MAX] {
        assert_eq!(decode_id(encode_id(id)), Some(id));
    }
    assert_eq!(encode_id(0x0102_0304), [1, 2, 3, 4]);
    assert_eq!(decode_id([0, 0, 0, 0]), None);
    assert_eq!(decode_id(encode_id(0)), None);
}
