/// Global rasterizer fill mode, changed only by explicit user command.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RenderMode {
    #[default]
    Solid,
    Wireframe,
    Point,
}

impl RenderMode {
    pub const ALL: [RenderMode; 3] = [Self::Solid, Self::Wireframe, Self::Point];

    pub fn polygon_mode(self) -> wgpu::PolygonMode {
        match self {
            Self::Solid => wgpu::PolygonMode::Fill,
            Self::Wireframe => wgpu::PolygonMode::Line,
            Self::Point => wgpu::PolygonMode::Point,
        }
    }

    /// Device feature needed to rasterize in this mode.
    pub fn required_feature(self) -> wgpu::Features {
        match self {
            Self::Solid => wgpu::Features::empty(),
            Self::Wireframe => wgpu::Features::POLYGON_MODE_LINE,
            Self::Point => wgpu::Features::POLYGON_MODE_POINT,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Solid => 0,
            Self::Wireframe => 1,
            Self::Point => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_mode_rasterizes_differently() {
        let fills: Vec<_> = RenderMode::ALL.iter().map(|m| m.polygon_mode()).collect();
        assert_eq!(
            fills,
            [wgpu::PolygonMode::Fill, wgpu::PolygonMode::Line, wgpu::PolygonMode::Point]
        );
        assert!(RenderMode::Solid.required_feature().is_empty());
    }

    #[test]
    fn indices_are_distinct() {
        let idx: Vec<_> = RenderMode::ALL.iter().map(|m| m.index()).collect();
        assert_eq!(idx, [0, 1, 2]);
    }
}
