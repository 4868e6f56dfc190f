use rand::Rng;

const CODE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const SHORT_CODE_LEN: usize = 6;

/// Random lowercase alphanumeric code; callers check it against stored ids.
pub fn short_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| char::from(CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())]))
        .collect()
}

/// Numeric code of `digits` digits, zero padded.
pub fn numeric_code(digits: u32) -> String {
    let upper = 10u32.pow(digits);
    format!("{:0width$}", rand::thread_rng().gen_range(0..upper), width = digits as usize)
}
