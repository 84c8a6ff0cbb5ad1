use super::*;

// Typed parameter list of one scene-description directive, e.g.
// `"float fov" [45]` or `"rgb L" [17 12 4]`. Lookups are by name with a
// caller-provided default; list accessors return everything declared.
#[derive(Clone, Debug)]
pub enum ParamValue {
    Floats(Vec<f32>),
    Ints(Vec<i32>),
    Strings(Vec<String>),
    Bools(Vec<bool>),
}

#[derive(Clone, Debug, Default)]
pub struct ParamSet {
    items: HashMap<String, ParamValue>,
}

impl ParamSet {
    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.items.insert(name.to_owned(), value);
    }

    fn floats(&self, name: &str) -> Option<&[f32]> {
        match self.items.get(name) {
            Some(ParamValue::Floats(values)) => Some(values),
            _ => None,
        }
    }

    pub fn find_one_float(&self, name: &str, default: f32) -> f32 {
        match self.floats(name) {
            Some([value]) => *value,
            _ => default,
        }
    }

    pub fn find_one_int(&self, name: &str, default: i32) -> i32 {
        match self.items.get(name) {
            Some(ParamValue::Ints(values)) if values.len() == 1 => values[0],
            _ => default,
        }
    }

    pub fn find_one_bool(&self, name: &str, default: bool) -> bool {
        match self.items.get(name) {
            Some(ParamValue::Bools(values)) if values.len() == 1 => values[0],
            _ => default,
        }
    }

    pub fn find_one_string(&self, name: &str, default: &str) -> String {
        match self.items.get(name) {
            Some(ParamValue::Strings(values)) if values.len() == 1 => values[0].clone(),
            _ => default.to_owned(),
        }
    }

    pub fn find_rgb(&self, name: &str) -> Option<ColorRgb> {
        match self.floats(name) {
            Some([r, g, b]) => Some(ColorRgb::new(*r, *g, *b)),
            _ => None,
        }
    }

    pub fn find_ints(&self, name: &str) -> Option<&[i32]> {
        match self.items.get(name) {
            Some(ParamValue::Ints(values)) => Some(values),
            _ => None,
        }
    }

    pub fn find_points(&self, name: &str) -> Result<Option<Vec<Point3>>> {
        let Some(values) = self.floats(name) else {
            return Ok(None);
        };
        ensure!(
            values.len() % 3 == 0,
            "config error: parameter {name} wants multiples of 3 values, got {}",
            values.len()
        );
        Ok(Some(
            values
                .chunks_exact(3)
                .map(|v| point![v[0], v[1], v[2]])
                .collect(),
        ))
    }

    pub fn find_normals(&self, name: &str) -> Result<Option<Vec<Normal>>> {
        let Some(points) = self.find_points(name)? else {
            return Ok(None);
        };
        Ok(Some(
            points.iter().map(|p| Normal::new_normalize(p.coords)).collect(),
        ))
    }

    pub fn find_point2s(&self, name: &str) -> Result<Option<Vec<Point2>>> {
        let Some(values) = self.floats(name) else {
            return Ok(None);
        };
        ensure!(
            values.len() % 2 == 0,
            "config error: parameter {name} wants multiples of 2 values, got {}",
            values.len()
        );
        Ok(Some(
            values
                .chunks_exact(2)
                .map(|v| point![v[0], v[1]])
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_typed_lookups() {
        let mut params = ParamSet::default();
        params.insert("fov", ParamValue::Floats(vec![45.0]));
        params.insert("L", ParamValue::Floats(vec![17.0, 12.0, 4.0]));
        params.insert("xresolution", ParamValue::Ints(vec![512]));
        params.insert("type", ParamValue::Strings(vec!["matte".to_owned()]));

        assert_ulps_eq!(params.find_one_float("fov", 90.0), 45.0, max_ulps = 1);
        assert_ulps_eq!(params.find_one_float("missing", 90.0), 90.0, max_ulps = 1);
        assert_eq!(params.find_one_int("xresolution", 256), 512);
        assert_eq!(params.find_one_string("type", "none"), "matte");
        let rgb = params.find_rgb("L").unwrap();
        assert_ulps_eq!(rgb.green(), 12.0, max_ulps = 1);
        assert!(params.find_rgb("fov").is_none());
    }

    #[test]
    fn test_point_chunking() {
        let mut params = ParamSet::default();
        params.insert("P", ParamValue::Floats(vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]));
        let points = params.find_points("P").unwrap().unwrap();
        assert_eq!(points.len(), 2);
        assert_ulps_eq!(points[1].coords, vector![3.0, 4.0, 5.0], max_ulps = 1);

        params.insert("bad", ParamValue::Floats(vec![0.0, 1.0]));
        assert!(params.find_points("bad").is_err());
    }
}
