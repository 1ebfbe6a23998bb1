//! BIP-380 descriptor checksum.

const INPUT_CHARSET: &str =
    "0123456789()[],'/*abcdefgh@:$%{}IJKLMNOPQRSTUVWXYZ&+-.;<=>?!^_|~ijklmnopqrstuvwxyzABCDEFGH`#\"\\ ";
const CHECKSUM_CHARSET: &[u8; 32] = b"qpzry9x8gf2tvdw0s3jn54khce6mua7l";

pub const CHECKSUM_LEN: usize = 8;

fn poly_mod(mut c: u64, val: u64) -> u64 {
    let c0 = c >> 35;
    c = ((c & 0x7_ffff_ffff) << 5) ^ val;
    if c0 & 1 != 0 {
        c ^= 0xf5_dee5_1989;
    }
    if c0 & 2 != 0 {
        c ^= 0xa9_fdca_3312;
    }
    if c0 & 4 != 0 {
        c ^= 0x1b_ab10_e32d;
    }
    if c0 & 8 != 0 {
        c ^= 0x37_06b1_677a;
    }
    if c0 & 16 != 0 {
        c ^= 0x64_4d62_6ffd;
    }
    c
}

/// Checksum of a descriptor body, or `None` if it contains a character
/// outside the descriptor alphabet.
pub fn descriptor_checksum(body: &str) -> Option<String> {
    let mut c = 1u64;
    let mut cls = 0u64;
    let mut cls_count = 0;
    for ch in body.chars() {
        let pos = INPUT_CHARSET.find(ch)? as u64;
        c = poly_mod(c, pos & 31);
        cls = cls * 3 + (pos >> 5);
        cls_count += 1;
        if cls_count == 3 {
            c = poly_mod(c, cls);
            cls = 0;
            cls_count = 0;
        }
    }
    if cls_count > 0 {
        c = poly_mod(c, cls);
    }
    for _ in 0..CHECKSUM_LEN {
        c = poly_mod(c, 0);
    }
    c ^= 1;

    let out = (0..CHECKSUM_LEN)
        .map(|j| CHECKSUM_CHARSET[((c >> (5 * (7 - j))) & 31) as usize] as char)
        .collect();
    Some(out)
}

/// Splits `body#checksum` into its parts. The checksum half is returned
/// verbatim and may be malformed.
pub fn split_checksum(descriptor: &str) -> (&str, Option<&str>) {
    match descriptor.rsplit_once('#') {
        Some((body, checksum)) => (body, Some(checksum)),
        None => (descriptor, None),
    }
}

/// Appends `#checksum`, replacing any existing one.
pub fn add_checksum(descriptor: &str) -> Option<String> {
    let (body, _) = split_checksum(descriptor);
    descriptor_checksum(body).map(|checksum| format!("{body}#{checksum}"))
}
