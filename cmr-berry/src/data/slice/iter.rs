use crate::Idx2d;

/// 图像边缘索引迭代器.
///
/// 按 "上边 -> 右边 -> 下边 -> 左边" 的顺时针顺序, 不重复地给出形状为 `(h, w)`
/// 的图像上所有位于边缘的像素索引. 空图像不产生任何索引.
///
/// 与先用行优先遍历再筛选边缘像素相比, 该迭代器只访问 `2 * (h + w)` 量级的位置.
#[derive(Debug)]
pub struct BorderIter {
    h: usize,
    w: usize,
    /// 当前所在的边: 0 上, 1 右, 2 下, 3 左, 4 结束.
    side: u8,
    /// 当前边上的偏移.
    offset: usize,
}

impl BorderIter {
    #[inline]
    pub fn new((h, w): Idx2d) -> Self {
        let side = if h == 0 || w == 0 { 4 } else { 0 };
        Self {
            h,
            w,
            side,
            offset: 0,
        }
    }

    /// 当前边的长度 (已去除与前一条边共享的角点).
    #[inline]
    fn side_len(&self) -> usize {
        match self.side {
            0 => self.w,
            1 => self.h - 1,
            // 单行图像的下边与上边重合.
            2 if self.h == 1 => 0,
            2 => self.w - 1,
            // 单列图像的左边与右边重合.
            3 if self.w == 1 => 0,
            3 => self.h.saturating_sub(2),
            _ => 0,
        }
    }
}

impl Iterator for BorderIter {
    type Item = Idx2d;

    fn next(&mut self) -> Option<Self::Item> {
        while self.side < 4 && self.offset >= self.side_len() {
            self.side += 1;
            self.offset = 0;
        }
        let k = self.offset;
        let (h, w) = (self.h, self.w);
        let pos = match self.side {
            0 => (0, k),
            1 => (k + 1, w - 1),
            2 => (h - 1, w - 2 - k),
            3 => (h - 2 - k, 0),
            _ => return None,
        };
        self.offset += 1;
        Some(pos)
    }
}
