use super::*;

// Scene-description front end: a pbrt-style token stream drives a builder
// value through `new -> directives -> world_end`, which hands back the
// finished renderer parts. All parser state lives in the builder.

pub struct ParsedScene {
    pub scene: Scene,
    pub params: RenderParams,
}

pub fn parse_description(text: &str) -> Result<ParsedScene> {
    let mut tokens = Tokens::new(text)?;
    let mut builder = SceneBuilder::new();
    while let Some(directive) = tokens.next_atom()? {
        match directive.as_str() {
            "Transform" => {
                let values = tokens.expect_floats(16)?;
                builder.transform(&values)?;
            }
            "AttributeBegin" => builder.attribute_begin(),
            "AttributeEnd" => builder.attribute_end()?,
            "Integrator" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.integrator(&kind, params)?;
            }
            "Sampler" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.sampler(&kind, params)?;
            }
            "Filter" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.filter(&kind, params)?;
            }
            "Film" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.film(&kind, params)?;
            }
            "Camera" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.camera(&kind, params)?;
            }
            "MakeNamedMaterial" => {
                let (name, params) = tokens.expect_typed_params()?;
                builder.make_named_material(&name, &params)?;
            }
            "NamedMaterial" => {
                let name = tokens.expect_quoted("material name")?;
                builder.named_material(&name)?;
            }
            "AreaLightSource" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.area_light_source(&kind, params)?;
            }
            "Shape" => {
                let (kind, params) = tokens.expect_typed_params()?;
                builder.shape(&kind, &params)?;
            }
            "WorldEnd" => return builder.world_end(),
            unknown => bail!("config error: unknown directive {unknown}"),
        }
    }
    bail!("config error: scene description ends without WorldEnd")
}

//
// Builder
//

pub struct SceneBuilder {
    current_transform: Transform,
    transform_stack: Vec<Transform>,
    integrator: Option<ParamSet>,
    sampler: Option<ParamSet>,
    film: Option<ParamSet>,
    camera: Option<(ParamSet, Transform)>,
    materials: Vec<Material>,
    named_materials: HashMap<String, u32>,
    current_material: Option<u32>,
    // Latched by AreaLightSource, consumed by the next Shape.
    area_light: Option<ColorRgb>,
    triangles: Vec<Triangle>,
    primitives: Vec<Primitive>,
    lights: Vec<Light>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self {
            current_transform: Transform::identity(),
            transform_stack: vec![],
            integrator: None,
            sampler: None,
            film: None,
            camera: None,
            materials: vec![],
            named_materials: HashMap::new(),
            current_material: None,
            area_light: None,
            triangles: vec![],
            primitives: vec![],
            lights: vec![],
        }
    }

    // Right-multiplies a column-major 4x4 matrix onto the current transform.
    pub fn transform(&mut self, values: &[f32]) -> Result<()> {
        ensure!(
            values.len() == 16,
            "config error: Transform wants 16 values, got {}",
            values.len()
        );
        let t = Transform::from_matrix(Mat4::from_column_slice(values))?;
        self.current_transform = self.current_transform * t;
        Ok(())
    }

    pub fn attribute_begin(&mut self) {
        self.transform_stack.push(self.current_transform);
    }

    pub fn attribute_end(&mut self) -> Result<()> {
        self.current_transform = self
            .transform_stack
            .pop()
            .context("config error: AttributeEnd without matching AttributeBegin")?;
        Ok(())
    }

    pub fn integrator(&mut self, kind: &str, params: ParamSet) -> Result<()> {
        ensure!(kind == "path", "config error: unknown integrator {kind}");
        self.integrator = Some(params);
        Ok(())
    }

    pub fn sampler(&mut self, kind: &str, params: ParamSet) -> Result<()> {
        ensure!(kind == "random", "config error: unknown sampler {kind}");
        self.sampler = Some(params);
        Ok(())
    }

    pub fn filter(&mut self, kind: &str, _params: ParamSet) -> Result<()> {
        ensure!(
            matches!(kind, "box" | "triangle" | "gaussian"),
            "config error: unknown filter {kind}"
        );
        Ok(())
    }

    pub fn film(&mut self, kind: &str, params: ParamSet) -> Result<()> {
        ensure!(kind == "image", "config error: unknown film {kind}");
        self.film = Some(params);
        Ok(())
    }

    pub fn camera(&mut self, kind: &str, params: ParamSet) -> Result<()> {
        ensure!(kind == "perspective", "config error: unknown camera {kind}");
        // The transform in effect here is world-to-camera.
        self.camera = Some((params, self.current_transform));
        Ok(())
    }

    pub fn make_named_material(&mut self, name: &str, params: &ParamSet) -> Result<()> {
        let kind = params.find_one_string("type", "");
        let material = make_material(&kind, params)?;
        let id = self.materials.len() as u32;
        self.materials.push(material);
        self.named_materials.insert(name.to_owned(), id);
        Ok(())
    }

    pub fn named_material(&mut self, name: &str) -> Result<()> {
        let id = self
            .named_materials
            .get(name)
            .with_context(|| format!("config error: no named material {name}"))?;
        self.current_material = Some(*id);
        Ok(())
    }

    pub fn area_light_source(&mut self, kind: &str, params: ParamSet) -> Result<()> {
        ensure!(
            matches!(kind, "diffuse" | "area"),
            "config error: unknown area light {kind}"
        );
        self.area_light = Some(
            params
                .find_rgb("L")
                .unwrap_or_else(|| ColorRgb::new(1.0, 1.0, 1.0)),
        );
        Ok(())
    }

    pub fn shape(&mut self, kind: &str, params: &ParamSet) -> Result<()> {
        ensure!(kind == "trianglemesh", "config error: unknown shape {kind}");
        let material = self
            .current_material
            .context("config error: Shape before any NamedMaterial")?;

        let positions = params
            .find_points("P")?
            .context("config error: trianglemesh misses required parameter P")?;
        let indices = params
            .find_ints("indices")
            .context("config error: trianglemesh misses required parameter indices")?;
        ensure!(
            indices.len() % 3 == 0,
            "config error: trianglemesh indices must come in triples, got {}",
            indices.len()
        );
        let normals = params.find_normals("N")?;
        if let Some(normals) = &normals {
            ensure!(
                normals.len() == positions.len(),
                "config error: trianglemesh has {} normals for {} vertices",
                normals.len(),
                positions.len()
            );
        }
        let tex_coords = params.find_point2s("uv")?;
        if let Some(tex_coords) = &tex_coords {
            ensure!(
                tex_coords.len() == positions.len(),
                "config error: trianglemesh has {} uvs for {} vertices",
                tex_coords.len(),
                positions.len()
            );
        }

        // Bake the current transform into world-space vertices.
        let to_world = self.current_transform;
        let positions = positions
            .iter()
            .map(|p| to_world.transform_point(p))
            .collect::<Vec<_>>();
        let normals = normals.map(|normals| {
            normals
                .iter()
                .map(|n| to_world.transform_normal(n))
                .collect::<Vec<_>>()
        });

        let area_light = self.area_light.take();
        for (triangle_index, face) in indices.chunks_exact(3).enumerate() {
            let vertex = |i: i32| -> Result<usize> {
                let i = usize::try_from(i).ok().filter(|&i| i < positions.len());
                i.with_context(|| {
                    format!("config error: trianglemesh index out of range in face {triangle_index}")
                })
            };
            let v = [vertex(face[0])?, vertex(face[1])?, vertex(face[2])?];
            let p = [positions[v[0]], positions[v[1]], positions[v[2]]];
            let uv = tex_coords.as_ref().map_or(
                [point![0.0, 0.0]; 3],
                |uvs| [uvs[v[0]], uvs[v[1]], uvs[v[2]]],
            );
            let triangle = match &normals {
                Some(normals) => {
                    Triangle::new(p, [normals[v[0]], normals[v[1]], normals[v[2]]], uv)
                }
                None => {
                    let triangle = Triangle::new(p, [normal!(0.0, 1.0, 0.0); 3], uv);
                    let n = triangle.geometric_normal();
                    Triangle::new(p, [n; 3], uv)
                }
            };
            ensure!(
                triangle.area > 0.0,
                "geometry error: degenerate triangle {triangle_index} in trianglemesh"
            );

            let shape = self.triangles.len() as u32;
            let light = if let Some(radiance) = area_light {
                self.lights.push(Light {
                    shape,
                    radiance,
                    delta: false,
                });
                (self.lights.len() - 1) as i32
            } else {
                -1
            };
            self.triangles.push(triangle);
            self.primitives.push(Primitive {
                shape,
                material,
                light,
            });
        }
        Ok(())
    }

    pub fn world_end(self) -> Result<ParsedScene> {
        let film = self.film.unwrap_or_default();
        let width = film.find_one_int("xresolution", 256);
        let height = film.find_one_int("yresolution", 256);
        ensure!(
            width > 0 && height > 0,
            "config error: film resolution must be positive, got {width}x{height}"
        );
        let resolution = (width as u32, height as u32);

        let (camera_params, world_to_camera) = self
            .camera
            .unwrap_or((ParamSet::default(), Transform::identity()));
        let fov = camera_params.find_one_float("fov", 90.0);
        ensure!(
            fov > 0.0 && fov < 180.0,
            "config error: camera fov must be in (0, 180), got {fov}"
        );
        let camera = Camera::new(world_to_camera, fov, resolution);

        let integrator = self.integrator.unwrap_or_default();
        let sampler = self.sampler.unwrap_or_default();
        let defaults = RenderParams::default();
        let max_depth = integrator.find_one_int("maxdepth", defaults.max_depth as i32);
        ensure!(
            max_depth > 0,
            "config error: integrator maxdepth must be positive, got {max_depth}"
        );
        let samples_per_pixel =
            sampler.find_one_int("pixelsamples", defaults.samples_per_pixel as i32);
        ensure!(
            samples_per_pixel > 0,
            "config error: sampler pixelsamples must be positive, got {samples_per_pixel}"
        );

        let scene = Scene::new(
            self.triangles,
            self.primitives,
            self.materials,
            self.lights,
            camera,
        )?;
        Ok(ParsedScene {
            scene,
            params: RenderParams {
                samples_per_pixel: samples_per_pixel as u32,
                max_depth: max_depth as u32,
            },
        })
    }

    #[cfg(test)]
    fn current_matrix(&self) -> Mat4 {
        *self.current_transform.matrix()
    }
}

fn make_material(kind: &str, params: &ParamSet) -> Result<Material> {
    match kind {
        "matte" | "Diffuse" => Ok(Material::Matte {
            reflectance: params
                .find_rgb("Kd")
                .unwrap_or_else(|| ColorRgb::new(0.5, 0.5, 0.5)),
        }),
        _ => bail!("config error: unknown material type {kind}"),
    }
}

//
// Tokenizer
//

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Atom(String),
    Quoted(String),
    Open,
    Close,
}

struct Tokens {
    tokens: Vec<Token>,
    cursor: usize,
}

impl Tokens {
    fn new(text: &str) -> Result<Self> {
        let mut tokens = vec![];
        let mut chars = text.chars().peekable();
        while let Some(&c) = chars.peek() {
            match c {
                '#' => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                '"' => {
                    chars.next();
                    let mut value = String::new();
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some(c) => value.push(c),
                            None => bail!("config error: unterminated string literal"),
                        }
                    }
                    tokens.push(Token::Quoted(value));
                }
                '[' => {
                    chars.next();
                    tokens.push(Token::Open);
                }
                ']' => {
                    chars.next();
                    tokens.push(Token::Close);
                }
                c if c.is_whitespace() => {
                    chars.next();
                }
                _ => {
                    let mut value = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() || matches!(c, '"' | '[' | ']' | '#') {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                    tokens.push(Token::Atom(value));
                }
            }
        }
        Ok(Self { tokens, cursor: 0 })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.cursor)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.cursor).cloned();
        if token.is_some() {
            self.cursor += 1;
        }
        token
    }

    // The next directive keyword, if any.
    fn next_atom(&mut self) -> Result<Option<String>> {
        match self.next() {
            None => Ok(None),
            Some(Token::Atom(value)) => Ok(Some(value)),
            Some(token) => bail!("config error: expected a directive, got {token:?}"),
        }
    }

    fn expect_quoted(&mut self, what: &str) -> Result<String> {
        match self.next() {
            Some(Token::Quoted(value)) => Ok(value),
            token => bail!("config error: expected {what}, got {token:?}"),
        }
    }

    // A quoted type name followed by its parameter list.
    fn expect_typed_params(&mut self) -> Result<(String, ParamSet)> {
        let kind = self.expect_quoted("a type name")?;
        let params = self.parse_params()?;
        Ok((kind, params))
    }

    fn expect_floats(&mut self, count: usize) -> Result<Vec<f32>> {
        let values = self.raw_values()?;
        let floats = parse_floats(&values)?;
        ensure!(
            floats.len() == count,
            "config error: expected {count} numbers, got {}",
            floats.len()
        );
        Ok(floats)
    }

    // Value tokens of one parameter: either a bracketed list or a single
    // token.
    fn raw_values(&mut self) -> Result<Vec<Token>> {
        if self.peek() == Some(&Token::Open) {
            self.next();
            let mut values = vec![];
            loop {
                match self.next() {
                    Some(Token::Close) => break,
                    Some(token @ (Token::Atom(_) | Token::Quoted(_))) => values.push(token),
                    token => bail!("config error: unexpected {token:?} in a value list"),
                }
            }
            Ok(values)
        } else {
            match self.next() {
                Some(token @ (Token::Atom(_) | Token::Quoted(_))) => Ok(vec![token]),
                token => bail!("config error: expected a parameter value, got {token:?}"),
            }
        }
    }

    // Parameters are declared as `"<type> <name>" <values>` pairs until the
    // next directive keyword.
    fn parse_params(&mut self) -> Result<ParamSet> {
        let mut params = ParamSet::default();
        while matches!(self.peek(), Some(Token::Quoted(_))) {
            let declaration = self.expect_quoted("a parameter declaration")?;
            let mut parts = declaration.split_whitespace();
            let (Some(kind), Some(name), None) = (parts.next(), parts.next(), parts.next())
            else {
                bail!("config error: malformed parameter declaration \"{declaration}\"");
            };
            let values = self.raw_values()?;
            let value = match kind {
                "float" | "rgb" | "color" | "point" | "point3" | "vector" | "normal"
                | "point2" => ParamValue::Floats(parse_floats(&values)?),
                "integer" => ParamValue::Ints(parse_ints(&values)?),
                "string" | "texture" => ParamValue::Strings(parse_strings(&values)?),
                "bool" => ParamValue::Bools(parse_bools(&values)?),
                _ => bail!("config error: unknown parameter type {kind}"),
            };
            params.insert(name, value);
        }
        Ok(params)
    }
}

fn parse_floats(values: &[Token]) -> Result<Vec<f32>> {
    values
        .iter()
        .map(|token| match token {
            Token::Atom(value) => value
                .parse::<f32>()
                .with_context(|| format!("config error: {value} is not a number")),
            token => bail!("config error: expected a number, got {token:?}"),
        })
        .collect()
}

fn parse_ints(values: &[Token]) -> Result<Vec<i32>> {
    values
        .iter()
        .map(|token| match token {
            Token::Atom(value) => value
                .parse::<i32>()
                .with_context(|| format!("config error: {value} is not an integer")),
            token => bail!("config error: expected an integer, got {token:?}"),
        })
        .collect()
}

fn parse_strings(values: &[Token]) -> Result<Vec<String>> {
    values
        .iter()
        .map(|token| match token {
            Token::Quoted(value) => Ok(value.clone()),
            token => bail!("config error: expected a string, got {token:?}"),
        })
        .collect()
}

fn parse_bools(values: &[Token]) -> Result<Vec<bool>> {
    values
        .iter()
        .map(|token| match token {
            Token::Atom(value) | Token::Quoted(value) => match value.as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => bail!("config error: {value} is not a bool"),
            },
            token => bail!("config error: expected a bool, got {token:?}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    const MINIMAL_SCENE: &str = r#"
        Integrator "path" "integer maxdepth" [3]
        Sampler "random" "integer pixelsamples" [2]
        Film "image" "integer xresolution" [8] "integer yresolution" [4]
        Camera "perspective" "float fov" [60]
        MakeNamedMaterial "white" "string type" "matte" "rgb Kd" [0.725 0.71 0.68]
        NamedMaterial "white"
        AttributeBegin
        AreaLightSource "diffuse" "rgb L" [1 1 1]
        Shape "trianglemesh"
            "integer indices" [0 1 2 0 2 3]
            "point P" [-1 2 -1  1 2 -1  1 2 1  -1 2 1]
            "normal N" [0 -1 0  0 -1 0  0 -1 0  0 -1 0]
        AttributeEnd
        Shape "trianglemesh"
            "integer indices" [0 1 2]
            "point P" [-1 0 -1  1 0 -1  0 0 1]
        WorldEnd
    "#;

    #[test]
    fn test_parse_minimal_scene() {
        let parsed = parse_description(MINIMAL_SCENE).unwrap();
        assert_eq!(parsed.scene.camera.resolution(), (8, 4));
        assert_eq!(parsed.scene.triangles.len(), 3);
        assert_eq!(parsed.scene.lights.len(), 2);
        assert_eq!(parsed.params.max_depth, 3);
        assert_eq!(parsed.params.samples_per_pixel, 2);

        // The area light binds to its shape only.
        let emissive = parsed
            .scene
            .primitives
            .iter()
            .filter(|primitive| primitive.light >= 0)
            .count();
        assert_eq!(emissive, 2);
        assert!(parsed.scene.primitives[2].light < 0);
    }

    #[test]
    fn test_unknown_directive_is_fatal() {
        assert!(parse_description("Frobnicate \"foo\"").is_err());
    }

    #[test]
    fn test_unknown_types_are_fatal() {
        assert!(parse_description("Shape \"sphere\" WorldEnd").is_err());
        assert!(
            parse_description("MakeNamedMaterial \"m\" \"string type\" \"metal\" WorldEnd")
                .is_err()
        );
        assert!(parse_description("Camera \"orthographic\" WorldEnd").is_err());
        assert!(parse_description("Integrator \"bdpt\" WorldEnd").is_err());
    }

    #[test]
    fn test_missing_world_end_is_fatal() {
        assert!(parse_description("Integrator \"path\"").is_err());
    }

    #[test]
    fn test_attribute_stack_round_trip() {
        let mut builder = SceneBuilder::new();
        let outer = Mat4::new_translation(&vector![1.0, 2.0, 3.0]);
        let inner = Mat4::new_translation(&vector![-4.0, 0.0, 9.0]);
        builder.transform(outer.as_slice()).unwrap();
        let snapshot = builder.current_matrix();

        builder.attribute_begin();
        builder.transform(inner.as_slice()).unwrap();
        builder.attribute_begin();
        builder.transform(inner.as_slice()).unwrap();
        builder.attribute_end().unwrap();
        builder.attribute_end().unwrap();

        assert_ulps_eq!(builder.current_matrix(), snapshot, max_ulps = 1);

        let mut builder = SceneBuilder::new();
        assert!(builder.attribute_end().is_err());
    }

    #[test]
    fn test_transform_composes_on_the_right() {
        let mut builder = SceneBuilder::new();
        let a = Mat4::new_translation(&vector![1.0, 0.0, 0.0]);
        let b = Mat4::new_nonuniform_scaling(&vector![2.0, 2.0, 2.0]);
        builder.transform(a.as_slice()).unwrap();
        builder.transform(b.as_slice()).unwrap();
        assert_ulps_eq!(builder.current_matrix(), a * b, max_ulps = 1);
    }
}
