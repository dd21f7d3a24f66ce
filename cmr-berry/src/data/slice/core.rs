use std::collections::VecDeque;
use std::ops::Index;

use ndarray::{Array2, ArrayView2};

use super::iter::BorderIter;
use crate::{Idx2d, Point2d};

/// 不可变、借用的二维水平分割标签切片.
pub struct LabelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::MyoLabel`] 或 ROI 掩膜.
    ///
    /// 这里有意把代码写死为 `ArrayView` 降低灵活性, 但使结构的意图更加明确.
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for LabelSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> LabelSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<u8> {
        self.data.view()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 判断一个索引是否合法 (未越界).
    #[inline]
    pub fn check(&self, (h, w): Idx2d) -> bool {
        let (h_len, w_len) = self.shape();
        h < h_len && w < w_len
    }

    /// 统计图像中值为 `label` 的像素总个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|&p| *p == label).count()
    }

    /// 判断图像上是否有值为 `label` 的像素.
    #[inline]
    pub fn contains(&self, label: u8) -> bool {
        self.data.iter().any(|&p| p == label)
    }

    /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
        self.data.indexed_iter()
    }

    /// 获得 `pos` 的 4-邻域像素索引. 保证返回的索引都不越界.
    pub fn n4_positions(&self, (h, w): Idx2d) -> Vec<Idx2d> {
        [
            (h.wrapping_sub(1), w),
            (h.saturating_add(1), w),
            (h, w.wrapping_sub(1)),
            (h, w.saturating_add(1)),
        ]
        .into_iter()
        .filter(|p| self.check(*p))
        .collect()
    }

    /// 值为 `label` 的像素的质心 `(h, w)`. 不存在该像素时返回 `None`.
    pub fn center_of_mass(&self, label: u8) -> Option<Point2d> {
        let (mut cnt, mut sh, mut sw) = (0usize, 0.0, 0.0);
        for ((h, w), _) in self.indexed_iter().filter(|(_, p)| **p == label) {
            cnt += 1;
            sh += h as f64;
            sw += w as f64;
        }
        (cnt != 0).then(|| (sh / cnt as f64, sw / cnt as f64))
    }

    /// 从 `seeds` 出发, 按照 4-相邻规则获取所有可达像素. 一个像素可达,
    /// 当且仅当存在一条从某个种子到它的 4-相邻路径, 且路径上的所有像素
    /// (包括种子本身) 都满足谓词 `pred`.
    ///
    /// 返回与图像同形状的可达性掩膜.
    pub fn reachable_from<I, P>(&self, seeds: I, pred: P) -> Array2<bool>
    where
        I: IntoIterator<Item = Idx2d>,
        P: Fn(u8) -> bool,
    {
        let mut vis = Array2::from_elem(self.shape(), false);
        let mut bfs_q: VecDeque<Idx2d> = seeds
            .into_iter()
            .filter(|p| self.check(*p) && pred(self[*p]))
            .collect();

        while let Some(cur) = bfs_q.pop_front() {
            if vis[cur] {
                continue;
            }
            vis[cur] = true;
            bfs_q.extend(
                self.n4_positions(cur)
                    .into_iter()
                    .filter(|neigh| !vis[*neigh] && pred(self[*neigh])),
            );
        }
        vis
    }

    /// 获取被 "墙" 像素 (满足 `is_wall`) 完全包围的空洞像素.
    ///
    /// 空洞即那些无法经由 4-相邻的非墙像素到达图像边缘的非墙像素,
    /// 与二值孔洞填充 (hole filling) 的定义一致. 结果按行优先存储.
    pub fn holes<P: Fn(u8) -> bool>(&self, is_wall: P) -> Vec<Idx2d> {
        let outside = self.reachable_from(BorderIter::new(self.shape()), |p| !is_wall(p));
        self.indexed_iter()
            .filter_map(|(pos, &pix)| (!is_wall(pix) && !outside[pos]).then_some(pos))
            .collect()
    }
}
