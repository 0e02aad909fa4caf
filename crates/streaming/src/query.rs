use foundation::geo::LatLngBounds;

/// Spatial and attribute filters for one feature fetch.
///
/// Renders to the wire parameters of an ArcGIS-style `query` operation:
/// the owning layer supplies `where`/fields/token once, and the
/// coordinator narrows each per-cell copy to that cell's envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureQuery {
    pub where_clause: String,
    /// Attribute names to request; empty means all (`*`).
    pub fields: Vec<String>,
    pub token: Option<String>,
    pub geometry: Option<LatLngBounds>,
}

impl Default for FeatureQuery {
    fn default() -> Self {
        Self {
            where_clause: "1=1".to_string(),
            fields: Vec::new(),
            token: None,
            geometry: None,
        }
    }
}

impl FeatureQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attribute filter. Double quotes are normalized to single
    /// quotes, matching what the remote service's SQL dialect expects.
    pub fn where_clause(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = clause.into().replace('"', "'");
        self
    }

    pub fn fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Restricts results to features intersecting `bounds`.
    pub fn intersecting(mut self, bounds: LatLngBounds) -> Self {
        self.geometry = Some(bounds);
        self
    }

    /// Renders the query as form parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("f".to_string(), "json".to_string()),
            ("returnGeometry".to_string(), "true".to_string()),
            ("outSr".to_string(), "4326".to_string()),
            ("where".to_string(), self.where_clause.clone()),
        ];

        let out_fields = if self.fields.is_empty() {
            "*".to_string()
        } else {
            self.fields.join(",")
        };
        params.push(("outFields".to_string(), out_fields));

        if let Some(bounds) = self.geometry {
            params.push((
                "geometry".to_string(),
                format!(
                    "{},{},{},{}",
                    bounds.west, bounds.south, bounds.east, bounds.north
                ),
            ));
            params.push(("geometryType".to_string(), "esriGeometryEnvelope".to_string()));
            params.push((
                "spatialRel".to_string(),
                "esriSpatialRelIntersects".to_string(),
            ));
            params.push(("inSr".to_string(), "4326".to_string()));
        }

        if let Some(token) = &self.token {
            params.push(("token".to_string(), token.clone()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::FeatureQuery;
    use foundation::geo::LatLngBounds;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn defaults_match_the_service_conventions() {
        let params = FeatureQuery::new().to_params();
        assert_eq!(param(&params, "f"), Some("json"));
        assert_eq!(param(&params, "where"), Some("1=1"));
        assert_eq!(param(&params, "outFields"), Some("*"));
        assert_eq!(param(&params, "returnGeometry"), Some("true"));
        assert_eq!(param(&params, "outSr"), Some("4326"));
        assert_eq!(param(&params, "geometry"), None);
        assert_eq!(param(&params, "token"), None);
    }

    #[test]
    fn fields_are_comma_joined() {
        let params = FeatureQuery::new()
            .fields(vec!["name".to_string(), "population".to_string()])
            .to_params();
        assert_eq!(param(&params, "outFields"), Some("name,population"));
    }

    #[test]
    fn envelope_renders_as_spatial_filter() {
        let params = FeatureQuery::new()
            .intersecting(LatLngBounds::new(-122.5, 45.0, -122.0, 45.5))
            .to_params();
        assert_eq!(param(&params, "geometry"), Some("-122.5,45,-122,45.5"));
        assert_eq!(param(&params, "geometryType"), Some("esriGeometryEnvelope"));
        assert_eq!(param(&params, "spatialRel"), Some("esriSpatialRelIntersects"));
        assert_eq!(param(&params, "inSr"), Some("4326"));
    }

    #[test]
    fn where_clause_normalizes_double_quotes() {
        let params = FeatureQuery::new()
            .where_clause("type = \"good\"")
            .to_params();
        assert_eq!(param(&params, "where"), Some("type = 'good'"));
    }

    #[test]
    fn token_is_forwarded_when_present() {
        let params = FeatureQuery::new()
            .token(Some("secret".to_string()))
            .to_params();
        assert_eq!(param(&params, "token"), Some("secret"));
    }
}
