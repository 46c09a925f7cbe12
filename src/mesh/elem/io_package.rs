use std::fmt;
use std::str::FromStr;

/// External tools whose element connectivity conventions are known to the library
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IoPackage {
    Tecplot,
    Gmv,
    Vtk,
    Gmsh,
    Ucd,
    Diva,
    Tetgen,
    Libmesh,
}

impl IoPackage {
    /// Can the tool represent second-order elements directly
    ///
    /// Quadratic elements are written as collections of linear sub-elements (or corner-only
    /// approximations) for tools that can't
    pub fn supports_second_order(&self) -> bool {
        !matches!(self, Self::Tecplot | Self::Gmv)
    }

    /// Are node ids written 1-based
    pub fn one_based(&self) -> bool {
        matches!(self, Self::Tecplot | Self::Gmv | Self::Gmsh | Self::Ucd)
    }

    /// Does the tool write one record per linear sub-element rather than per element
    pub fn writes_sub_elems(&self) -> bool {
        matches!(self, Self::Tecplot)
    }
}

impl FromStr for IoPackage {
    type Err = ConnectivityError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_ascii_lowercase().as_str() {
            "tecplot" => Ok(Self::Tecplot),
            "gmv" => Ok(Self::Gmv),
            "vtk" => Ok(Self::Vtk),
            "gmsh" => Ok(Self::Gmsh),
            "ucd" => Ok(Self::Ucd),
            "diva" => Ok(Self::Diva),
            "tetgen" => Ok(Self::Tetgen),
            "libmesh" => Ok(Self::Libmesh),
            _ => Err(ConnectivityError::UnknownFormat(name.to_string())),
        }
    }
}

impl fmt::Display for IoPackage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Tecplot => "Tecplot",
            Self::Gmv => "GMV",
            Self::Vtk => "VTK",
            Self::Gmsh => "Gmsh",
            Self::Ucd => "UCD",
            Self::Diva => "DIVA",
            Self::Tetgen => "TetGen",
            Self::Libmesh => "libMesh",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    UnsupportedFormat(IoPackage),
    UnknownFormat(String),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedFormat(format) => write!(
                f,
                "{} connectivity is not supported for this element type!",
                format
            ),
            Self::UnknownFormat(name) => write!(f, "'{}' is not a known output format!", name),
        }
    }
}

impl std::error::Error for ConnectivityError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_format_names() {
        assert_eq!("tecplot".parse::<IoPackage>().unwrap(), IoPackage::Tecplot);
        assert_eq!("VTK".parse::<IoPackage>().unwrap(), IoPackage::Vtk);
        assert_eq!("Gmv".parse::<IoPackage>().unwrap(), IoPackage::Gmv);
    }

    #[test]
    fn unknown_format_name() {
        assert_eq!(
            "paraview".parse::<IoPackage>(),
            Err(ConnectivityError::UnknownFormat(String::from("paraview")))
        );
    }

    #[test]
    fn format_capabilities() {
        assert!(!IoPackage::Tecplot.supports_second_order());
        assert!(IoPackage::Tecplot.writes_sub_elems());
        assert!(IoPackage::Vtk.supports_second_order());
        assert!(!IoPackage::Vtk.one_based());
        assert!(IoPackage::Gmv.one_based());
    }
}
