//! 通用工具函数

/// 生成人类可读的号牌标签，如 "T-042"
pub fn format_token_label(number: u32) -> String {
    format!("T-{:03}", number)
}

/// 由当前在场号牌推导下一个号牌序号
///
/// 取现存最大序号加一；队列清空后从 1 重新起号，
/// 因此号牌在一个排队周期内单调递增，允许出现空号。
pub fn next_token_number<I>(existing: I) -> u32
where
    I: IntoIterator<Item = u32>,
{
    existing.into_iter().max().map(|n| n + 1).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_token_label() {
        assert_eq!(format_token_label(1), "T-001");
        assert_eq!(format_token_label(42), "T-042");
        assert_eq!(format_token_label(1205), "T-1205");
    }

    #[test]
    fn test_next_token_number() {
        // 空队列从 1 起号
        assert_eq!(next_token_number(Vec::<u32>::new()), 1);
        assert_eq!(next_token_number(vec![1, 2, 3]), 4);
        // 空号不影响推导，始终取最大值加一
        assert_eq!(next_token_number(vec![2, 7]), 8);
    }
}
