//! Color-band atlas: baked curve tables packed as rows of one RGBA texture.
//!
//! Each mapping contributes one row of `TABLE_SIZE` texels whose components
//! hold the channel tables. The row index, as a float, is the `layer`
//! uniform the shader snippets read the row with.

use curvenode_core::{BakedMapping, TABLE_SIZE};

use crate::error::GpuError;

/// CPU-side accumulator of color-band rows.
#[derive(Debug, Clone, Default)]
pub struct ColorBandAtlas {
    texels: Vec<[f32; 4]>,
}

impl ColorBandAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one row and return its layer.
    pub fn push_row(&mut self, row: &[[f32; 4]]) -> Result<f32, GpuError> {
        if row.len() != TABLE_SIZE {
            return Err(GpuError::BandWidth {
                got: row.len(),
                expected: TABLE_SIZE,
            });
        }
        let layer = self.row_count() as f32;
        self.texels.extend_from_slice(row);
        Ok(layer)
    }

    /// Append the interleaved tables of `baked` and return the layer.
    pub fn push_mapping(&mut self, baked: &BakedMapping) -> f32 {
        let layer = self.row_count() as f32;
        self.texels.extend(baked.table_rgba());
        layer
    }

    pub fn row_count(&self) -> usize {
        self.texels.len() / TABLE_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    /// Texels of row `layer`, if present.
    pub fn row(&self, layer: usize) -> Option<&[[f32; 4]]> {
        self.texels.get(layer * TABLE_SIZE..(layer + 1) * TABLE_SIZE)
    }

    pub fn texels(&self) -> &[[f32; 4]] {
        &self.texels
    }

    /// Upload as an `Rgba32Float` texture, `TABLE_SIZE` wide and one row
    /// per layer. An empty atlas uploads a single zero row.
    pub fn upload(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> ColorBandTexture {
        let rows = self.row_count().max(1) as u32;
        let zero_row;
        let data: &[[f32; 4]] = if self.texels.is_empty() {
            zero_row = vec![[0.0f32; 4]; TABLE_SIZE];
            &zero_row
        } else {
            &self.texels
        };

        let size = wgpu::Extent3d {
            width: TABLE_SIZE as u32,
            height: rows,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("curvenode_color_band"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(data),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(TABLE_SIZE as u32 * 16),
                rows_per_image: Some(rows),
            },
            size,
        );

        tracing::debug!(rows, "uploaded color band atlas");

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        ColorBandTexture {
            texture,
            view,
            rows,
        }
    }
}

/// A color-band atlas resident on the GPU.
pub struct ColorBandTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub rows: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvenode_core::CurveMapping;

    #[test]
    fn test_layers_are_row_indices() {
        let mut atlas = ColorBandAtlas::new();
        let a = atlas.push_mapping(&CurveMapping::color().ensure_baked());
        let b = atlas.push_mapping(&CurveMapping::vector().ensure_baked());
        assert_eq!(a, 0.0);
        assert_eq!(b, 1.0);
        assert_eq!(atlas.row_count(), 2);
        assert_eq!(atlas.texels().len(), 2 * TABLE_SIZE);
    }

    #[test]
    fn test_row_contents_follow_tables() {
        let mut atlas = ColorBandAtlas::new();
        let baked = CurveMapping::vector().ensure_baked();
        let layer = atlas.push_mapping(&baked) as usize;
        let row = atlas.row(layer).unwrap();
        assert_eq!(row[0][0], baked.channel(0).table()[0]);
        assert_eq!(row[TABLE_SIZE - 1][2], baked.channel(2).table()[TABLE_SIZE - 1]);
        // No fourth channel: identity ramp.
        assert_eq!(row[TABLE_SIZE - 1][3], 1.0);
        assert!(atlas.row(1).is_none());
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut atlas = ColorBandAtlas::new();
        let err = atlas.push_row(&[[0.0; 4]; 8]).unwrap_err();
        assert!(matches!(err, GpuError::BandWidth { got: 8, .. }));
        assert!(atlas.is_empty());
        assert_eq!(atlas.push_row(&vec![[0.5; 4]; TABLE_SIZE]).unwrap(), 0.0);
    }
}
