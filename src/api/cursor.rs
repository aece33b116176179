//! 分页游标
//!
//! 模拟一个需要客户端多次往返才能取完结果的查询，用于驱动注册表的模拟负载。

use log::debug;
use std::ops::Range;

use crate::query::RegisteredQuery;

/// 按批次返回行号的结果游标
#[derive(Debug)]
pub struct PagedCursor {
    total_rows: u64,
    position: u64,
    batch_size: u64,
}

impl PagedCursor {
    pub fn new(total_rows: u64, batch_size: u64) -> Self {
        Self {
            total_rows,
            position: 0,
            batch_size: batch_size.max(1),
        }
    }

    /// 取下一批结果
    pub fn next_batch(&mut self) -> Range<u64> {
        let start = self.position;
        let end = (start + self.batch_size).min(self.total_rows);
        self.position = end;
        start..end
    }

    pub fn has_more(&self) -> bool {
        self.position < self.total_rows
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl RegisteredQuery for PagedCursor {
    fn teardown(self) {
        debug!(
            "Cursor released at row {}/{}",
            self.position, self.total_rows
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_batches() {
        let mut cursor = PagedCursor::new(5, 2);
        assert!(cursor.has_more());
        assert_eq!(cursor.next_batch(), 0..2);
        assert_eq!(cursor.next_batch(), 2..4);
        assert_eq!(cursor.next_batch(), 4..5);
        assert!(!cursor.has_more());
        assert_eq!(cursor.next_batch(), 5..5);
        assert_eq!(cursor.position(), 5);
    }

    #[test]
    fn test_cursor_zero_batch_size() {
        let mut cursor = PagedCursor::new(3, 0);
        assert_eq!(cursor.next_batch(), 0..1);
    }
}
